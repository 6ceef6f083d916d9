// trellis-users server

use std::sync::Arc;
use trellis_config::ConfigLoader;
use trellis_core::{Application, ErrorReporter, HttpMethod, NullReporter, RegistryContext, TracingReporter};
use trellis_openapi::{OpenApiCollector, spec_handler, spec_json_path};
use trellis_users::{PersistenceSession, ServiceError, api_document, cors_policy, declare};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("trellis-users: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), ServiceError> {
    let config = ConfigLoader::new().dotenv(".env").load()?;
    let _guard = config.log_config()?.init()?;

    let reporter: Arc<dyn ErrorReporter> = if config.error_reporting_enabled() {
        Arc::new(TracingReporter::new(config.reporting_environment()))
    } else {
        Arc::new(NullReporter)
    };

    let mut ctx = RegistryContext::new();
    declare(&mut ctx, PersistenceSession::in_memory());

    let mut docs = OpenApiCollector::new(api_document(env!("CARGO_PKG_VERSION")).build());
    let mut app = Application::builder(&ctx)
        .reporter(reporter)
        .cors(cors_policy())
        .build(&mut docs)?;
    app.mount(HttpMethod::GET, spec_json_path(&config.docs_path), spec_handler(&docs)?)?;

    app.listen(config.socket_addr()?).await?;
    Ok(())
}
