use std::io;
use std::process::{Child, Command};
use which::which;

/// Hot-reloading UI dev server, only started in development mode. The
/// bundled `ui/dist` build is used otherwise.
pub struct ViteServer {
    pub process: Child,
    pub port: u16,
}

impl ViteServer {
    pub fn new() -> io::Result<Self> {
        let npm = which("npm")
            .map_err(|e| io::Error::new(io::ErrorKind::NotFound, format!("npm not found: {}", e)))?;
        let port = portpicker::pick_unused_port()
            .ok_or_else(|| io::Error::new(io::ErrorKind::AddrInUse, "no free ports"))?;

        log::info!("starting UI dev server on port {}", port);

        let process = Command::new(npm)
            .args([
                "run",
                "dev",
                "--",
                "--port",
                &port.to_string(),
                "--strictPort",
                "--host",
            ])
            .current_dir("ui")
            .spawn()?;

        Ok(Self { process, port })
    }
}

impl Drop for ViteServer {
    fn drop(&mut self) {
        let _ = self.process.kill();
    }
}
