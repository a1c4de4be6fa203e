/* 📖 # Why does the CLI take no arguments?

The server has exactly one job: serve the viewer and relay archive downloads. Everything it
needs has a default, an optional `zipview.toml` in the working directory can change the
host, static root and proxy settings, and the `PORT` environment variable picks the port.

Exit codes:
- 0: Server stopped
- 1: Error (invalid configuration, port unavailable)
*/

use std::env;
use std::process;
use std::thread;
use std::time::Duration;

use tracing::{error, info};
use zipview_base::tracing::init_tracing;
use zipview_base::{HttpServerConfig, PalHandle, RealPal};
use zipview_engine::{ZipViewService, load_config_from_environment};

fn main() {
    if let Err(e) = init_tracing() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    let current_dir = env::current_dir().unwrap_or_else(|e| {
        eprintln!("Error: Failed to get current directory: {}", e);
        process::exit(1);
    });

    let pal = PalHandle::new(RealPal::new(current_dir));

    let config = match load_config_from_environment(&*pal) {
        Ok(config) => config,
        Err(e) => {
            error!(error = ?e, "failed to load configuration");
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    let server_config = HttpServerConfig::new(config.host.as_str()).with_port(config.port);
    let host = config.host.clone();
    let service = ZipViewService::new(pal.clone(), config);
    let handle = match pal.start_http_server(Box::new(service), server_config) {
        Ok(handle) => handle,
        Err(e) => {
            error!(error = ?e, "failed to start server");
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    info!(address = %handle.address(&host), "server listening");
    println!("Server running at http://{}", handle.address(&host));
    println!("Proxy available at /api/proxy?url=...");

    while !handle.is_shutdown() {
        thread::sleep(Duration::from_millis(500));
    }
}
