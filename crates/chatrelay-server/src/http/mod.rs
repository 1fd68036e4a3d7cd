//! Plain HTTP routes.
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `query` | `POST /query`: one-shot prompt, NDJSON streamed response |
//! | `framing` | Response unit encoding for `/query` |
//! | `homepage` | `GET /`: chat page with embedded client script |
//! | `health` | `GET /health` liveness probe |

pub mod framing;
pub mod health;
pub mod homepage;
pub mod query;
