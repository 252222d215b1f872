use std::net::{Ipv4Addr, SocketAddr};

use anyhow::Result;

use super::super::http;
use super::super::Container;

pub struct ServeController<'a> {
    container: &'a Container,
}

impl<'a> ServeController<'a> {
    pub fn new(container: &'a Container) -> Self {
        Self { container }
    }

    pub async fn serve(&self, port: u16, public: bool) -> Result<String> {
        let host = if public {
            Ipv4Addr::UNSPECIFIED
        } else {
            Ipv4Addr::LOCALHOST
        };
        http::serve(SocketAddr::from((host, port)), self.container.gateway()).await?;
        Ok("Server stopped.".to_string())
    }
}
