//! qset-codec — the binary envelope spoken by the qset bulk-data endpoint.
//!
//! # Overview
//!
//! Bulk rows travel as MessagePack. Plain MessagePack cannot carry calendar
//! dates, wall-clock times or exact decimals without going through strings or
//! floats, so the envelope adds four extension types:
//!
//! | Tag | Type | Rust value |
//! |-----|------|------------|
//! | 1 | date | [`chrono::NaiveDate`] |
//! | 2 | datetime | [`chrono::NaiveDateTime`] / [`chrono::DateTime`]`<FixedOffset>` |
//! | 3 | decimal | [`ExactDecimal`] |
//! | 4 | time | [`chrono::NaiveTime`] |
//!
//! - [`Value`] — the closed value domain
//! - [`encode`] / [`decode`] — envelope <-> bytes
//! - [`CodecError`] — structured error type

pub mod codec;
pub mod decimal;
pub mod error;
pub mod ext;
pub mod value;

pub use codec::{decode, encode};
pub use decimal::ExactDecimal;
pub use error::{CodecError, ParseDecimalError};
pub use value::{Map, MapKey, Value};
