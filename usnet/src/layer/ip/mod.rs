//! The IP layer.
//!
//! Forwards IPv4 datagrams between the Ethernet interfaces of a [`Router`]. Every datagram
//! received on one of its ports is matched against the route table, the longest matching prefix
//! selects the outgoing interface and the link-level next hop. The hop limit is decremented on
//! the way and datagrams whose hop limit runs out are dropped.
//!
//! Nothing here touches the payload and no fragment reassembly is provided.
//!
//! [`Router`]: struct.Router.html
mod route;
mod router;
#[cfg(test)]
mod tests;

pub use route::{
    Route,
    Routes,
};

pub use router::{
    Port,
    Router,
};
