// ViewerContext middleware and extractors
// The identity provider authenticates; this layer only maps its header to a user

pub mod viewer_context_extractor;
pub mod viewer_context_middleware;

pub use viewer_context_extractor::{login_redirect, AuthenticatedViewer, Vc};
pub use viewer_context_middleware::{resolve_viewer, viewer_context_middleware};
