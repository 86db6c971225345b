mod ingestor;

pub use ingestor::IngestError;
pub use ingestor::Ingestor;
