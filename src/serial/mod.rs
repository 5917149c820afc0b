//! Serial link to the display panel: transport port, shared link, and the
//! frame-decoding receive task.

pub mod dispatcher;
pub mod link;
pub mod transport;
