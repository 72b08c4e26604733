use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use logmass::adapters::{
    http::{router, state::HttpState},
    onnx::{model_catalog::OnnxModelCatalog, model_handle::ModelHandle},
    precomputed::PrecomputedDetector,
    render::ImageprocAnnotator,
};
use logmass::application::{
    dto::EstimateResponse,
    ports::{DetectorPort, ModelCatalogPort},
    services::EstimationService,
};
use logmass::config::{Cli, Command, EstimateArgs, ServeArgs};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Inicializar logs (RUST_LOG=info por defecto). Van a stderr para no mezclarse con el JSON.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    match Cli::parse().command {
        Command::Serve(args) => serve(args).await,
        Command::Estimate(args) => estimate(args).await,
    }
}

async fn serve(args: ServeArgs) -> anyhow::Result<()> {
    tracing::info!("🔧 Inicializando adaptadores de infraestructura...");

    let calibration = args.calibration.to_calibration()?;
    let infer = args.yolo.inference_config(&args.model);

    // Validación preventiva antes de aceptar peticiones
    OnnxModelCatalog::new().validate_model(&infer.model).await?;

    // 2. Instanciar Adaptadores. El modelo es único en el proceso y se comparte con Arc.
    let model = Arc::new(ModelHandle::new(infer.clone()));
    if args.preload {
        let m = model.clone();
        tokio::task::spawn_blocking(move || m.get_or_init().map(|_| ()))
            .await
            .context("tarea de precarga abortada")??;
    }
    let annotator = Arc::new(ImageprocAnnotator::load(args.font.as_deref()));

    // 3. Instanciar Servicios (Capa de Aplicación - Casos de Uso)
    let estimation = Arc::new(
        EstimationService::new(model.clone(), annotator, calibration).with_yolo_params(infer.params),
    );

    // 4. Router de Axum
    let state = HttpState { estimation };
    let app = router(state, (args.max_upload_mb * 1024 * 1024) as usize);

    // 5. Lanzar el Servidor
    let listener = tokio::net::TcpListener::bind(&args.bind)
        .await
        .with_context(|| format!("no se pudo escuchar en {}", args.bind))?;
    tracing::info!("🚀 Servidor de estimación iniciado en http://{}", listener.local_addr()?);
    tracing::info!(
        "📐 Calibración: {} m/px, {}, tora de {} m",
        calibration.pixels_to_meters(),
        calibration.wood(),
        calibration.log_length_m()
    );

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    model.teardown();
    tracing::info!("Servidor detenido");
    Ok(())
}

async fn estimate(args: EstimateArgs) -> anyhow::Result<()> {
    let calibration = args.calibration.to_calibration()?;
    let bytes = std::fs::read(&args.image)
        .with_context(|| format!("no se pudo leer {}", args.image.display()))?;

    let mut model: Option<Arc<ModelHandle>> = None;
    let detector: Arc<dyn DetectorPort> = match (&args.detections, &args.model) {
        (Some(path), _) => Arc::new(PrecomputedDetector::from_json_file(path)?),
        (None, Some(model_path)) => {
            let infer = args.yolo.inference_config(model_path);
            OnnxModelCatalog::new().validate_model(&infer.model).await?;
            let handle = Arc::new(ModelHandle::new(infer));
            model = Some(handle.clone());
            handle
        }
        (None, None) => anyhow::bail!("se necesita --model o --detections"),
    };

    let annotator = Arc::new(ImageprocAnnotator::load(args.font.as_deref()));
    let service = EstimationService::new(detector, annotator, calibration);
    let report = service.estimate_image(bytes, None).await?;

    if let Some(model) = model {
        model.teardown();
    }

    if let Some(out) = &args.output {
        report
            .annotated
            .save(out)
            .with_context(|| format!("no se pudo guardar {}", out.display()))?;
        tracing::info!("Imagen anotada guardada en {}", out.display());
    }

    println!("{}", serde_json::to_string_pretty(&EstimateResponse::from_report(&report, false))?);
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("No se pudo instalar el manejador de Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Señal de parada recibida");
}
