mod common;
mod unary;
