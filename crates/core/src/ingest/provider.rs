use crate::domain::movie::MovieDetail;
use crate::ingest::types::DiscoverMovie;
use anyhow::Result;

/// One "list by sort key and page" request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoverQuery {
    pub sort_by: &'static str,
    pub min_votes: u32,
    pub page: u32,
}

/// Read-only view of an external movie catalog.
#[async_trait::async_trait]
pub trait MovieCatalog: Send + Sync {
    fn provider_name(&self) -> &'static str;

    async fn discover_page(&self, query: &DiscoverQuery) -> Result<Vec<DiscoverMovie>>;

    async fn movie_detail(&self, id: i64) -> Result<MovieDetail>;
}
