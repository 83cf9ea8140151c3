//! Local server for a site: builds assets once, then serves files.
//!
//! Requests resolve against the build output first, then `www/`.

mod path;
mod response;

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tiny_http::{Request, Server};

use crate::cli::build::build_assets;
use crate::config::SiteConfig;
use crate::core::{is_shutdown, register_server};
use crate::{debug, log};

/// Maximum number of port binding attempts.
const MAX_PORT_RETRIES: u16 = 10;

/// Worker threads answering requests.
const REQUEST_THREADS: usize = 4;

/// Static file directory inside a site.
pub const WWW_DIR: &str = "www";

/// Directories a request may be served from, in lookup order.
#[derive(Debug, Clone)]
struct ServeRoots {
    dirs: Vec<PathBuf>,
    not_found_page: Option<PathBuf>,
}

impl ServeRoots {
    fn for_site(config: &SiteConfig) -> Self {
        let www = config.root.join(WWW_DIR);
        let page = www.join("404.html");
        Self {
            dirs: vec![config.output_dir(), www],
            not_found_page: page.is_file().then_some(page),
        }
    }
}

/// Build the site's assets, then serve it until Ctrl+C.
pub fn serve_site(config: &SiteConfig) -> Result<()> {
    log!("server"; "Starting the {} server...", config.requested_mode);
    build_assets(config, config.requested_mode, false)?;

    let (server, addr) = bind_with_retry(IpAddr::V4(Ipv4Addr::LOCALHOST), config.port)?;
    let server = Arc::new(server);
    register_server(Arc::clone(&server));

    crate::logger::extra(&[
        format!("View your site at http://localhost:{}", addr.port()),
        "Ctrl + C to quit".to_string(),
    ]);

    run_request_loop(&server, Arc::new(ServeRoots::for_site(config)))
}

/// Bind to the specified interface and port, with automatic port retry.
fn bind_with_retry(interface: IpAddr, base_port: u16) -> Result<(Server, SocketAddr)> {
    let mut last_error = None;
    for offset in 0..MAX_PORT_RETRIES {
        let Some(port) = base_port.checked_add(offset) else {
            break;
        };
        let addr = SocketAddr::new(interface, port);

        match Server::http(addr) {
            Ok(server) => {
                if offset > 0 {
                    log!("server"; "port {} in use, using {} instead", base_port, port);
                }
                return Ok((server, addr));
            }
            Err(e) => last_error = Some(e),
        }
    }

    Err(anyhow::anyhow!(
        "Failed to bind after {} attempts starting at port {}: {}",
        MAX_PORT_RETRIES,
        base_port,
        last_error.map(|e| e.to_string()).unwrap_or_default()
    ))
}

fn run_request_loop(server: &Server, roots: Arc<ServeRoots>) -> Result<()> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(REQUEST_THREADS)
        .build()
        .context("failed to create request thread pool")?;

    for request in server.incoming_requests() {
        let roots = Arc::clone(&roots);
        pool.spawn(move || {
            if let Err(e) = handle_request(request, &roots) {
                log!("server"; "request error: {e}");
            }
        });
    }
    Ok(())
}

/// Handle a single HTTP request
fn handle_request(request: Request, roots: &ServeRoots) -> Result<()> {
    if is_shutdown() {
        return response::respond_unavailable(request);
    }
    if !response::is_read_request(&request) {
        return response::respond_method_not_allowed(request);
    }

    debug!("server"; "{} {}", request.method(), request.url());
    match path::resolve_in(request.url(), &roots.dirs) {
        Some(file) => response::respond_file(request, &file),
        None => response::respond_not_found(request, roots.not_found_page.as_deref()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    #[test]
    fn test_bind_skips_busy_port() {
        let busy = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = busy.local_addr().unwrap().port();

        let (_server, addr) = bind_with_retry(IpAddr::V4(Ipv4Addr::LOCALHOST), port).unwrap();
        assert_ne!(addr.port(), port);
        assert!(addr.port() > port && addr.port() < port.saturating_add(MAX_PORT_RETRIES));
    }

    #[test]
    fn test_serve_roots_order() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = SiteConfig::load_with(
            tmp.path(),
            false,
            None,
            &crate::config::EnvOverrides::default(),
        )
        .unwrap();
        let roots = ServeRoots::for_site(&config);

        assert!(roots.dirs[0].ends_with("data/.assets"));
        assert!(roots.dirs[1].ends_with(WWW_DIR));
        assert!(roots.not_found_page.is_none());
    }
}
