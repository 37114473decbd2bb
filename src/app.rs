use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::broadcaster::{Broadcaster, trigger_channel};
use crate::config::PreviewConfig;
use crate::error::{PreviewError, PreviewResult};
use crate::registry::ClientRegistry;
use crate::render::{PlantUmlClient, Renderer};
use crate::state::AppState;
use crate::watcher::FileWatcher;
use crate::web::routes::routes;

/// A started preview: watcher attached, server bound, broadcaster ready.
pub struct PreviewApp {
    pub addr: SocketAddr,
    state: AppState,
    watcher: FileWatcher,
    broadcaster: Broadcaster,
    server: std::pin::Pin<Box<dyn Future<Output = ()> + Send>>,
}

impl PreviewApp {
    /// Establish the watch and bind the listener. Either failing is fatal.
    pub fn start(config: &PreviewConfig) -> PreviewResult<Self> {
        let renderer = Arc::new(PlantUmlClient::new(config.server_url.clone())?);
        Self::start_with_renderer(config, renderer)
    }

    pub fn start_with_renderer(
        config: &PreviewConfig,
        renderer: Arc<dyn Renderer>,
    ) -> PreviewResult<Self> {
        let registry = Arc::new(ClientRegistry::new());
        let (triggers, trigger_rx) = trigger_channel();

        let watcher = FileWatcher::start(&config.input, triggers.clone())?;

        let requested = config.socket_addr();
        let state = AppState::new(registry.clone(), triggers);
        let (addr, server) = warp::serve(routes(state.clone()))
            .try_bind_ephemeral(requested)
            .map_err(|e| PreviewError::bind(requested, e))?;

        let broadcaster = Broadcaster::new(
            config.input.clone(),
            renderer,
            registry,
            trigger_rx,
        )
        .with_coalesce_window(config.coalesce_window);

        Ok(Self {
            addr,
            state,
            watcher,
            broadcaster,
            server: Box::pin(server),
        })
    }

    /// Serve and broadcast until the server stops or `shutdown` resolves.
    pub async fn run_until<F>(self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let Self {
            addr,
            state,
            watcher,
            broadcaster,
            server,
        } = self;
        tracing::info!(
            "previewing {} at http://{}",
            watcher.path().display(),
            addr
        );

        let broadcasting = tokio::spawn(broadcaster.run());

        tokio::select! {
            _ = server => tracing::warn!("preview server stopped"),
            _ = shutdown => tracing::info!(viewers = state.registry.count(), "shutting down"),
        }

        // Connections and any in-flight render are dropped with the process.
        broadcasting.abort();
        drop(watcher);
    }
}

pub async fn run(config: PreviewConfig) -> PreviewResult<()> {
    let app = PreviewApp::start(&config)?;
    app.run_until(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    })
    .await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::encode_diagram;
    use std::path::PathBuf;
    use std::time::Duration;
    use tokio::sync::mpsc::UnboundedReceiver;
    use url::Url;
    use warp::Filter;

    async fn spawn_render_service() -> SocketAddr {
        let svg = warp::path!("plantuml" / "svg" / String)
            .map(|encoded: String| format!("<svg data-src=\"{}\"></svg>", encoded));
        let (addr, server) = warp::serve(svg).bind_ephemeral(([127, 0, 0, 1], 0));
        tokio::spawn(server);
        addr
    }

    fn config_for(input: PathBuf, render: SocketAddr, port: u16) -> PreviewConfig {
        PreviewConfig {
            input,
            host: "127.0.0.1".parse().unwrap(),
            port,
            server_url: Url::parse(&format!("http://{}/plantuml", render)).unwrap(),
            coalesce_window: Duration::from_millis(50),
        }
    }

    fn expected_svg(source: &str) -> String {
        format!("<svg data-src=\"{}\"></svg>", encode_diagram(source).unwrap())
    }

    /// Editors and `fs::write` may emit several modify events per save; wait
    /// until the push for the final content shows up.
    async fn wait_for_push(rx: &mut UnboundedReceiver<String>, expected: &str) {
        tokio::time::timeout(Duration::from_secs(10), async {
            while let Some(markup) = rx.recv().await {
                if markup == expected {
                    return;
                }
            }
            panic!("viewer queue closed");
        })
        .await
        .expect("no matching push within 10s");
    }

    #[test]
    fn test_missing_input_fails_before_binding() {
        let dir = tempfile::tempdir().unwrap();
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let config = config_for(dir.path().join("absent.puml"), ([127, 0, 0, 1], 1).into(), port);
        let err = PreviewApp::start(&config).err().unwrap();
        assert!(matches!(err, PreviewError::Watch { .. }));
        // The port was never taken.
        assert!(std::net::TcpListener::bind(("127.0.0.1", port)).is_ok());
    }

    #[tokio::test]
    async fn test_port_in_use_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("diagram.puml");
        std::fs::write(&input, "@startuml\nA->B\n@enduml").unwrap();
        let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = taken.local_addr().unwrap().port();

        let config = config_for(input, ([127, 0, 0, 1], 1).into(), port);
        let err = PreviewApp::start(&config).err().unwrap();
        assert!(matches!(err, PreviewError::Bind { .. }));
    }

    #[tokio::test]
    async fn test_file_changes_reach_open_viewers() {
        let render = spawn_render_service().await;
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("diagram.puml");
        std::fs::write(&input, "@startuml\nA->B\n@enduml").unwrap();

        let app = PreviewApp::start(&config_for(input.clone(), render, 0)).unwrap();
        assert_ne!(app.addr.port(), 0);
        let registry = app.state.registry.clone();
        let (_viewer, mut rx) = registry.register();
        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
        let running = tokio::spawn(app.run_until(async {
            let _ = stop_rx.await;
        }));

        std::fs::write(&input, "@startuml\nA->C\n@enduml").unwrap();
        wait_for_push(&mut rx, &expected_svg("@startuml\nA->C\n@enduml")).await;

        std::fs::write(&input, "@startuml\nA->D\n@enduml").unwrap();
        wait_for_push(&mut rx, &expected_svg("@startuml\nA->D\n@enduml")).await;

        stop_tx.send(()).unwrap();
        running.await.unwrap();
    }

    #[tokio::test]
    async fn test_new_viewer_gets_current_render_without_file_change() {
        let render = spawn_render_service().await;
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("diagram.puml");
        std::fs::write(&input, "@startuml\nA->B\n@enduml").unwrap();

        let app = PreviewApp::start(&config_for(input, render, 0)).unwrap();
        let viewer_routes = routes(app.state.clone());
        let registry = app.state.registry.clone();
        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
        let running = tokio::spawn(app.run_until(async {
            let _ = stop_rx.await;
        }));

        let mut client = warp::test::ws()
            .path("/ws")
            .handshake(viewer_routes)
            .await
            .expect("handshake");
        let msg = tokio::time::timeout(Duration::from_secs(10), client.recv())
            .await
            .expect("no render pushed on connect")
            .unwrap();
        assert_eq!(msg.to_str().unwrap(), expected_svg("@startuml\nA->B\n@enduml"));
        assert_eq!(registry.count(), 1);

        stop_tx.send(()).unwrap();
        running.await.unwrap();
    }

    #[tokio::test]
    async fn test_viewer_page_served_on_bound_port() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("diagram.puml");
        std::fs::write(&input, "@startuml\nA->B\n@enduml").unwrap();

        let app = PreviewApp::start(&config_for(input, ([127, 0, 0, 1], 1).into(), 0)).unwrap();
        let addr = app.addr;
        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
        let running = tokio::spawn(app.run_until(async {
            let _ = stop_rx.await;
        }));

        let page = reqwest::get(format!("http://{}/", addr)).await.unwrap();
        assert_eq!(page.status(), reqwest::StatusCode::OK);
        assert!(page.text().await.unwrap().contains("new WebSocket"));

        let missing = reqwest::get(format!("http://{}/elsewhere", addr)).await.unwrap();
        assert_eq!(missing.status(), reqwest::StatusCode::NOT_FOUND);
        assert_eq!(missing.text().await.unwrap(), "Not Found");

        stop_tx.send(()).unwrap();
        running.await.unwrap();
    }
}
