//! Expression language for calculated contract fields.
//!
//! Contracts declare conditional values as a constrained CASE/WHEN grammar:
//!
//! ```text
//! CASE
//!     WHEN app.app_type_code = 'SEC' AND contact.ac_role_tp_c = 'PR' THEN 'secured'
//!     WHEN app.score >= 700 OR app.override_flag IS NOT EMPTY THEN 'review'
//!     ELSE 'standard'
//! END
//! ```
//!
//! - **parser**: text → [`Expression`] (rejects `IN (...)` membership lists)
//! - **eval**: [`Expression::evaluate`] against an [`ExprContext`]

#![deny(unsafe_code)]

pub mod ast;
pub mod error;
pub mod eval;
pub mod parser;
mod token;

pub use ast::{
    CompareOp, Comparison, Condition, Expression, LikePattern, Literal, Operand, Value, WhenClause,
};
pub use error::ExpressionError;
pub use eval::{ExprContext, ExprValue};
pub use parser::parse_expression;
