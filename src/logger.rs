use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{HeaderName, HeaderValue},
    Error,
};
use futures::future::LocalBoxFuture;
use log::{info, warn};
use std::rc::Rc;
use std::time::Instant;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Request logging middleware
///
/// Tags every request with an id, echoed back in `x-request-id`, and logs
/// method, path, status and latency. Query strings are not logged.
pub struct LoggerMiddleware;

impl<S, B> Transform<S, ServiceRequest> for LoggerMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = LoggerMiddlewareService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(LoggerMiddlewareService {
            service: Rc::new(service),
        }))
    }
}

pub struct LoggerMiddlewareService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for LoggerMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let start_time = Instant::now();
        let request_id = uuid::Uuid::new_v4().to_string();
        let method = req.method().to_string();
        let path = req.path().to_string();

        info!("[{}] Request started: {} {}", request_id, method, path);

        let service = self.service.clone();

        Box::pin(async move {
            let mut res = match service.call(req).await {
                Ok(res) => res,
                Err(e) => {
                    warn!(
                        "[{}] Request failed: {} {} - {} ({}ms)",
                        request_id,
                        method,
                        path,
                        e,
                        start_time.elapsed().as_millis()
                    );
                    return Err(e);
                }
            };

            let status = res.status();
            let message = format!(
                "[{}] Request completed: {} {} - Status: {} ({}ms)",
                request_id,
                method,
                path,
                status.as_u16(),
                start_time.elapsed().as_millis()
            );
            if status.is_server_error() {
                warn!("{}", message);
            } else {
                info!("{}", message);
            }

            if let Ok(value) = HeaderValue::from_str(&request_id) {
                res.headers_mut()
                    .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
            }

            Ok(res)
        })
    }
}
