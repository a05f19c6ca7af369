pub mod classify;
pub mod crawler;
pub mod error;
pub mod extract;
pub mod frontier;
pub mod normalize;
pub mod request;
pub mod result;
pub mod transport;
pub mod writer;

pub use classify::Category;
pub use crawler::{Crawler, ProgressCallback, ResultCallback, parse_seed};
pub use error::ScanError;
pub use extract::{Extractor, LinkMatch};
pub use frontier::{EnqueueOutcome, Frontier};
pub use request::{Label, Request};
pub use result::CrawlResult;
pub use writer::{ArtifactWriter, CollisionPolicy, OutputLayout};
