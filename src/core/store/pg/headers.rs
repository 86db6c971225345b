use postgres_from_row::FromRow;
use tokio_postgres::Client;
use tokio_postgres::Transaction;

use crate::core::store::BlockBatch;
use crate::core::types::Header;
use crate::core::types::HeaderID;
use crate::core::types::TipState;

/// A record from the `gidx.headers` table.
#[derive(Debug, FromRow)]
pub(super) struct HeaderRecord {
    pub height: i32,
    pub timestamp: i64,
    pub header_id: String,
    pub parent_id: String,
    pub last_global_index: i64,
    pub max_timestamp: i64,
}

impl HeaderRecord {
    pub fn header(&self) -> Header {
        Header {
            height: self.height,
            timestamp: self.timestamp,
            header_id: self.header_id.clone(),
            parent_id: self.parent_id.clone(),
        }
    }

    pub fn tip_state(&self) -> TipState {
        TipState {
            header: self.header(),
            last_global_index: self.last_global_index,
            max_timestamp: self.max_timestamp,
        }
    }
}

/// Retrieve highest main chain header.
///
/// The pre-genesis placeholder guarantees at least one row.
pub(super) async fn get_tip(client: &Client) -> Result<HeaderRecord, tokio_postgres::Error> {
    let qry = "
        select height
            , timestamp
            , header_id
            , parent_id
            , last_global_index
            , max_timestamp
        from gidx.headers
        where main_chain
        order by height desc
        limit 1;";
    let row = client.query_one(qry, &[]).await?;
    Ok(HeaderRecord::from_row(&row))
}

/// Retrieve main chain header with given `header_id`, if any.
pub(super) async fn get_main(
    client: &Client,
    header_id: &HeaderID,
) -> Result<Option<HeaderRecord>, tokio_postgres::Error> {
    let qry = "
        select height
            , timestamp
            , header_id
            , parent_id
            , last_global_index
            , max_timestamp
        from gidx.headers
        where header_id = $1 and main_chain;";
    Ok(client
        .query_opt(qry, &[&header_id])
        .await?
        .map(|row| HeaderRecord::from_row(&row)))
}

pub(super) async fn insert_main(
    pgtx: &Transaction<'_>,
    batch: &BlockBatch,
) -> Result<(), tokio_postgres::Error> {
    let sql = "
        insert into gidx.headers (header_id, parent_id, height, timestamp, main_chain, last_global_index, max_timestamp)
        values ($1, $2, $3, $4, true, $5, $6)
        -- A block unwound by an earlier reorg can get re-included.
        on conflict (header_id) do update
            set main_chain = true
            , last_global_index = excluded.last_global_index
            , max_timestamp = excluded.max_timestamp;";
    pgtx.execute(
        sql,
        &[
            &batch.header.header_id,
            &batch.header.parent_id,
            &batch.header.height,
            &batch.header.timestamp,
            &batch.last_global_index,
            &batch.max_timestamp,
        ],
    )
    .await?;
    Ok(())
}

pub(super) async fn mark_off_chain(
    pgtx: &Transaction<'_>,
    header_id: &HeaderID,
) -> Result<(), tokio_postgres::Error> {
    let sql = "update gidx.headers set main_chain = false where header_id = $1;";
    let n_modified = pgtx.execute(sql, &[&header_id]).await?;
    assert_eq!(n_modified, 1);
    Ok(())
}
