use tokio_postgres::Transaction;

use crate::core::types::HeaderID;
use crate::core::types::IndexedTransaction;

pub(super) async fn insert_many(
    pgtx: &Transaction<'_>,
    header_id: &HeaderID,
    records: &[IndexedTransaction],
) -> Result<(), tokio_postgres::Error> {
    let sql = "
        insert into gidx.transactions (
            transaction_id,
            header_id,
            height,
            timestamp,
            size,
            intra_block_index,
            global_index,
            main_chain
        ) values ($1, $2, $3, $4, $5, $6, $7, true)
        -- Re-included after an earlier unwind.
        on conflict (transaction_id, header_id) do update
            set global_index = excluded.global_index
            , main_chain = true;";
    let stmt = pgtx.prepare(sql).await?;
    for r in records {
        pgtx.execute(
            &stmt,
            &[
                &r.id,
                &header_id,
                &r.height,
                &r.timestamp,
                &r.size,
                &r.index,
                &r.global_index,
            ],
        )
        .await?;
    }
    Ok(())
}

pub(super) async fn mark_off_chain(
    pgtx: &Transaction<'_>,
    header_id: &HeaderID,
) -> Result<u64, tokio_postgres::Error> {
    let sql = "update gidx.transactions set main_chain = false where header_id = $1;";
    pgtx.execute(sql, &[&header_id]).await
}
