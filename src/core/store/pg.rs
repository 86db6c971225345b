mod headers;
mod transactions;

use async_trait::async_trait;
use lru::LruCache;
use tokio_postgres::Client;
use tokio_postgres::NoTls;

use super::BlockBatch;
use super::Repository;
use super::StoreError;
use crate::config::PostgresConfig;
use crate::core::types::Header;
use crate::core::types::HeaderID;
use crate::core::types::Height;
use crate::core::types::TipState;
use crate::utils::Schema;

/// Number of recent main chain headers kept in memory.
/// Sized to cover fork point searches without hitting the db.
const HEADER_CACHE_SIZE: usize = 100;

pub struct PgStore {
    client: Client,
    tip: TipState,
    /// Recent main chain headers, by id.
    header_cache: LruCache<HeaderID, Header>,
}

impl PgStore {
    pub async fn new(pgconf: &PostgresConfig) -> Result<Self, StoreError> {
        tracing::debug!("initializing store");
        let (mut client, connection) =
            tokio_postgres::connect(&pgconf.connection_uri, NoTls).await?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!("connection error: {}", e);
            }
        });

        let schema = Schema::new("gidx", include_str!("schema.sql"));
        schema.init(&mut client).await?;

        let tip = headers::get_tip(&client).await?.tip_state();
        tracing::debug!("store is at {:?}", &tip.header);

        Ok(Self {
            client,
            tip,
            header_cache: LruCache::new(
                std::num::NonZeroUsize::new(HEADER_CACHE_SIZE).unwrap(),
            ),
        })
    }
}

#[async_trait]
impl Repository for PgStore {
    async fn tip(&self) -> Result<TipState, StoreError> {
        Ok(self.tip.clone())
    }

    async fn include_block(&mut self, batch: &BlockBatch) -> Result<(), StoreError> {
        tracing::trace!("including block {:?}", &batch.header);
        assert_eq!(batch.header.height, self.tip.height() + 1);
        assert_eq!(batch.header.parent_id, self.tip.header.header_id);

        // Records and cursor go in one db transaction.
        let pgtx = self.client.transaction().await?;
        headers::insert_main(&pgtx, batch).await?;
        transactions::insert_many(&pgtx, &batch.header.header_id, &batch.transactions).await?;
        cursor::set(&pgtx, batch.last_global_index).await?;
        pgtx.commit().await?;

        self.tip = batch.tip();
        self.header_cache
            .put(batch.header.header_id.clone(), batch.header.clone());
        Ok(())
    }

    async fn roll_back(&mut self, height: Height) -> Result<TipState, StoreError> {
        tracing::trace!("rolling back height {height}");
        assert_eq!(self.tip.height(), height);

        let parent = headers::get_main(&self.client, &self.tip.header.parent_id)
            .await?
            .ok_or_else(|| StoreError::MissingParent(self.tip.header.header_id.clone()))?;

        let pgtx = self.client.transaction().await?;
        headers::mark_off_chain(&pgtx, &self.tip.header.header_id).await?;
        transactions::mark_off_chain(&pgtx, &self.tip.header.header_id).await?;
        cursor::set(&pgtx, parent.last_global_index).await?;
        pgtx.commit().await?;

        self.header_cache.pop(&self.tip.header.header_id);
        self.tip = parent.tip_state();
        Ok(self.tip.clone())
    }

    async fn get_main_header(
        &mut self,
        header_id: &HeaderID,
    ) -> Result<Option<Header>, StoreError> {
        if let Some(header) = self.header_cache.get(header_id) {
            return Ok(Some(header.clone()));
        }
        match headers::get_main(&self.client, header_id).await? {
            Some(record) => {
                let header = record.header();
                self.header_cache.put(header_id.clone(), header.clone());
                Ok(Some(header))
            }
            None => Ok(None),
        }
    }
}

/// Access to the gidx.cursor singleton.
mod cursor {
    use crate::core::types::GlobalIndex;
    use tokio_postgres::Transaction;

    pub(super) async fn set(
        pgtx: &Transaction<'_>,
        last_global_index: GlobalIndex,
    ) -> Result<(), tokio_postgres::Error> {
        let sql = "update gidx.cursor set last_global_index = $1;";
        let n_modified = pgtx.execute(sql, &[&last_global_index]).await?;
        assert_eq!(n_modified, 1);
        Ok(())
    }
}
