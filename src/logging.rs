use rocket::{
    fairing::{Fairing, Info, Kind},
    http::StatusClass,
    Data, Orbit, Request, Response, Rocket,
};
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicUsize, Ordering};

/// A unique identifier for a particular request, so the request and
/// response lines of one exchange can be matched up in the log.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd)]
pub struct RequestId(pub usize);

impl Display for RequestId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl RequestId {
    /// Atomically get the next ID. Wraps around to zero if you somehow exceed a usize.
    pub fn next() -> RequestId {
        static REQUEST_ID_COUNTER: AtomicUsize = AtomicUsize::new(0);
        RequestId(REQUEST_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// A rocket fairing that logs every request and response.
#[derive(Debug, Copy, Clone)]
pub struct LoggerFairing;

#[rocket::async_trait]
impl Fairing for LoggerFairing {
    fn info(&self) -> Info {
        Info {
            name: "Logger",
            kind: Kind::Liftoff | Kind::Request | Kind::Response | Kind::Shutdown,
        }
    }

    async fn on_liftoff(&self, rocket: &Rocket<Orbit>) {
        let protocol = if rocket.config().tls_enabled() {
            "https"
        } else {
            "http"
        };
        let ip = &rocket.config().address;
        let port = &rocket.config().port;
        info!("Server launched on {protocol}://{ip}:{port}");
    }

    async fn on_request(&self, req: &mut Request<'_>, _data: &mut Data<'_>) {
        let id = req.local_cache(RequestId::next);
        info!("->req{id} {} {}", req.method(), req.uri());
    }

    async fn on_response<'r>(&self, req: &'r Request<'_>, res: &mut Response<'r>) {
        let id = req.local_cache(RequestId::next);
        let code = res.status();
        let route = match req.route() {
            Some(r) => {
                let mut str = r.uri.to_string();
                if let Some(ref name) = r.name {
                    str = format!("{name} ({str})");
                }
                str
            }
            None => "UNKNOWN ROUTE".to_string(),
        };
        let log_msg = format!("<-rsp{id} {code} {route}");
        match code.class() {
            StatusClass::ServerError => error!("{log_msg}"),
            StatusClass::ClientError => warn!("{log_msg}"),
            _ => info!("{log_msg}"),
        }
    }

    async fn on_shutdown(&self, _rocket: &Rocket<Orbit>) {
        warn!("Shutdown requested, stopping gracefully...");
    }
}
