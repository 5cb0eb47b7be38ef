//! Request middleware. The access log is the outermost layer, so CORS
//! preflights answered before routing are logged and tagged too.

pub mod access_log;
