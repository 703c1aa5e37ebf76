//! # slipbot-payments
//!
//! M-Pesa (Daraja) STK push initiation and parsing of the asynchronous
//! payment callbacks it produces.

pub mod callback;
pub mod mpesa;

pub use callback::{parse_stk_callback, CallbackError};
pub use mpesa::DarajaGateway;
