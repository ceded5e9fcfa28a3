//! HTTP surface of the citation service.
//!
//! # Endpoints
//!
//! - `POST /submit` - upload a PDF (multipart field `document`)
//! - `GET /query/{id}` - poll a document by the `documentId` returned on submit
//! - `GET /health` - health check
//!
//! # cURL Examples
//!
//! ```bash
//! curl -F "document=@decree.pdf;type=application/pdf" http://localhost:2510/submit
//! # {"status":"PENDING","documentId":"3f786850e387550fdab836ed7e6dc881de23001b"}
//!
//! curl http://localhost:2510/query/3f786850e387550fdab836ed7e6dc881de23001b
//! # {"status":"COMPLETED","result":["Nghị định số 15/2020/NĐ-CP "]}
//! ```

mod error;
mod handlers;
mod server;
mod types;

pub use error::{ApiError, Endpoint};
pub use handlers::DOCUMENT_FIELD;
pub use server::{create_router, serve};
pub use types::{ApiState, HealthResponse, QueryResponse, SubmitResponse};
