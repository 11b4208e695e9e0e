//! Gateway request handling in front of the auth and todo services.
//!
//! Every inbound route resolves to one of two flows:
//!
//! - **Cache-aside read** (`GET /todos`): check the store, fetch from the
//!   todo backend on a miss, fill the store on success ([`todos`]).
//! - **Pass-through**: forward method, mapped path, body and bearer
//!   credential to the owning backend and hand its status, body and
//!   content-type back verbatim ([`proxy`]).
//!
//! ```text
//! ┌─────────────┐
//! │   Request   │
//! └──────┬──────┘
//!        │
//!        ├─▶ GET /todos          (cache-aside, todo backend)
//!        ├─▶ /todos writes, /todos/{id}  (pass-through, todo backend)
//!        └─▶ /auth/*             (pass-through, auth backend)
//! ```
//!
//! Write routes do not invalidate the cached listing for the same caller;
//! a mutation can therefore be invisible to `GET /todos` until the entry's
//! TTL runs out. The staleness window is bounded by that TTL.

pub mod error;
pub mod proxy;
pub mod todos;
pub mod upstream;

pub use error::GatewayError;
pub use upstream::{HttpUpstreamClient, Upstream, UpstreamClient, UpstreamError, UpstreamResponse};
