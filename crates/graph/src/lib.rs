//! Citation graph construction over a remote works catalog.
//!
//! The pipeline turns one identifier (work id, catalog URL, or DOI) into a
//! bounded citation graph: the source, its most relevant foundations on the
//! reference side, and the most relevant follow-on work on the citing side,
//! with edges restricted to papers inside the graph. All remote access goes
//! through [`catalog::CatalogApi`]; batching, rate limiting, and retry live
//! behind that seam.

pub mod assemble;
pub mod builder;
pub mod catalog;
pub mod ids;
pub mod paper;
pub mod progress;
pub mod rank;
pub mod snapshot;

pub use assemble::{EdgeKind, GraphEdge, GraphNode};
pub use builder::{AuthorBuildOptions, BuildMetadata, BuildOptions, BuiltGraph, GraphService};
pub use catalog::{create_catalog, CatalogApi, MockCatalog, OpenAlexCatalog, Projection};
pub use ids::{parse_doi, CatalogId};
pub use paper::{Author, NodeRole, Paper, SlimPaper};
pub use progress::{channel as progress_channel, ProgressEvent, ProgressSender};
pub use snapshot::{SlimNode, SlimSnapshot};
