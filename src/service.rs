use crate::dispatcher::Dispatcher;
use crate::notification::Notification;
use crate::policy::ConfigurationError;
use actix_web::{post, web, HttpResponse};

pub const ACCEPTED_BODY: &str = "Notification sent or queued.";

/// Accept a notification for delivery.
///
/// Responds 202 Accepted, not 200 OK, once the notification has been delivered or placed on
/// the overflow queue; the body is the same "Notification sent or queued." either way.
/// Clients should treat any 2xx as success. A failed delivery is not reported back to the
/// caller.
#[post("/api/notification")]
async fn send_notification(
    dispatcher: web::Data<Dispatcher>,
    body: web::Json<Notification>,
) -> Result<HttpResponse, ConfigurationError> {
    dispatcher.send(body.into_inner()).await?;
    Ok(HttpResponse::Accepted().body(ACCEPTED_BODY))
}

/// Registers the notification endpoint.
///
/// The application must provide the [Dispatcher] as `web::Data<Dispatcher>`:
///
/// ```no_run
/// # use actix_web::{web, App, HttpServer};
/// # use notification_rate_limit::{service, Dispatcher, DrainLoop, LimiterRegistry, LoggingChannel, RateLimitOptions};
/// # async fn example(options: RateLimitOptions) -> Result<(), Box<dyn std::error::Error>> {
/// let registry = LimiterRegistry::builder(options.policies.clone()).build()?;
/// let dispatcher = Dispatcher::builder(registry, LoggingChannel).build();
/// let drain = DrainLoop::from_options(dispatcher.clone(), &options).spawn();
/// let data = web::Data::new(dispatcher);
/// HttpServer::new(move || App::new().app_data(data.clone()).configure(service::configure))
///     .bind(("127.0.0.1", 8080))?
///     .run()
///     .await?;
/// drain.shutdown().await;
/// # Ok(())
/// # }
/// ```
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(send_notification);
}
