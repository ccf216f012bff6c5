//! HTTP front end for the prediction service

pub mod api;
pub mod config;
