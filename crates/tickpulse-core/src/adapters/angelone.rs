use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use serde::Deserialize;

use crate::http_client::{HttpAuth, HttpClient, HttpRequest, HttpResponse, NoopHttpClient};
use crate::provider::{
    HistoricalSource, ProviderError, RealtimeFeed, SeriesRequest, SessionInfo, SessionProvider,
    UniverseSource,
};
use crate::{Candle, Instrument, InstrumentToken, PriceSeries, Symbol, UtcDateTime, ValidationError};

const LOGIN_PATH: &str = "/rest/auth/angelbroking/user/v1/loginByPassword";
const CANDLES_PATH: &str = "/rest/secure/angelbroking/historical/v1/getCandleData";
const SCRIP_MASTER_PATH: &str = "/OpenAPIScripMaster.json";

/// How long an established session is trusted before re-authenticating.
const SESSION_TTL_SECS: u64 = 6 * 60 * 60;

/// Credentials for the upstream SmartAPI-style REST provider.
///
/// `totp` is the current one-time code; rotating it is the embedding
/// process's concern.
#[derive(Debug, Clone)]
pub struct AngelOneCredentials {
    pub api_key: String,
    pub client_code: String,
    pub pin: String,
    pub totp: String,
}

impl AngelOneCredentials {
    /// Read credentials from `TICKPULSE_ANGEL_*` environment variables,
    /// falling back to demo values for offline use.
    pub fn from_env() -> Self {
        let read = |name: &str| std::env::var(name).unwrap_or_else(|_| String::from("demo"));
        Self {
            api_key: read("TICKPULSE_ANGEL_API_KEY"),
            client_code: read("TICKPULSE_ANGEL_CLIENT_CODE"),
            pin: read("TICKPULSE_ANGEL_PIN"),
            totp: read("TICKPULSE_ANGEL_TOTP"),
        }
    }
}

#[derive(Debug, Clone)]
struct CachedSession {
    info: SessionInfo,
    refreshed_at: Instant,
}

/// Upstream adapter implementing session, historical, universe, and feed
/// subscription contracts over one HTTP transport.
///
/// Mock mode (the default, via [`NoopHttpClient`]) generates deterministic
/// seeded data so the whole pipeline runs offline.
#[derive(Clone)]
pub struct AngelOneAdapter {
    http_client: Arc<dyn HttpClient>,
    credentials: AngelOneCredentials,
    base_url: String,
    session: Arc<Mutex<Option<CachedSession>>>,
    mock_mode: bool,
}

impl Default for AngelOneAdapter {
    fn default() -> Self {
        Self::mock()
    }
}

impl AngelOneAdapter {
    /// Deterministic offline adapter.
    pub fn mock() -> Self {
        Self {
            http_client: Arc::new(NoopHttpClient),
            credentials: AngelOneCredentials::from_env(),
            base_url: String::from("https://apiconnect.angelone.in"),
            session: Arc::new(Mutex::new(None)),
            mock_mode: true,
        }
    }

    /// Real adapter over the given transport.
    pub fn with_http_client(
        http_client: Arc<dyn HttpClient>,
        credentials: AngelOneCredentials,
    ) -> Self {
        Self {
            http_client,
            credentials,
            base_url: String::from("https://apiconnect.angelone.in"),
            session: Arc::new(Mutex::new(None)),
            mock_mode: false,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn cached_session(&self) -> Option<SessionInfo> {
        let guard = self
            .session
            .lock()
            .expect("session cache should not be poisoned");
        guard.as_ref().and_then(|cached| {
            if cached.refreshed_at.elapsed().as_secs() < SESSION_TTL_SECS {
                Some(cached.info.clone())
            } else {
                None
            }
        })
    }

    fn store_session(&self, info: SessionInfo) {
        let mut guard = self
            .session
            .lock()
            .expect("session cache should not be poisoned");
        *guard = Some(CachedSession {
            info,
            refreshed_at: Instant::now(),
        });
    }

    fn auth_for_secure_call(&self) -> Result<(HttpAuth, HttpAuth), ProviderError> {
        let session = self.cached_session().ok_or_else(|| {
            ProviderError::session_invalid("no valid session; call ensure_session first")
        })?;
        Ok((
            HttpAuth::BearerToken(session.auth_token),
            HttpAuth::Header {
                name: String::from("X-PrivateKey"),
                value: self.credentials.api_key.clone(),
            },
        ))
    }

    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ProviderError> {
        let response = self.http_client.execute(request).await.map_err(|error| {
            if error.retryable() {
                ProviderError::transient(format!("upstream transport error: {}", error.message()))
            } else {
                ProviderError::unclassified(format!(
                    "upstream transport error: {}",
                    error.message()
                ))
            }
        })?;

        classify_response_status(&response)?;
        Ok(response)
    }
}

/// Map the upstream's HTTP status onto the error taxonomy. Rate limiting is
/// recognized from the status code, never from message text.
fn classify_response_status(response: &HttpResponse) -> Result<(), ProviderError> {
    if response.is_success() {
        return Ok(());
    }

    if response.is_rate_limited() {
        return Err(ProviderError::rate_limited(format!(
            "upstream returned status {}",
            response.status
        )));
    }

    match response.status {
        401 | 403 => Err(ProviderError::session_invalid(format!(
            "upstream rejected credentials with status {}",
            response.status
        ))),
        500..=599 => Err(ProviderError::transient(format!(
            "upstream returned status {}",
            response.status
        ))),
        status => Err(ProviderError::unclassified(format!(
            "upstream returned status {status}"
        ))),
    }
}

impl SessionProvider for AngelOneAdapter {
    fn ensure_session(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<SessionInfo, ProviderError>> + Send + '_>> {
        Box::pin(async move {
            if let Some(session) = self.cached_session() {
                return Ok(session);
            }

            if self.mock_mode {
                let info = SessionInfo {
                    auth_token: String::from("mock-jwt"),
                    feed_token: String::from("mock-feed"),
                    established_at: UtcDateTime::now(),
                };
                self.store_session(info.clone());
                return Ok(info);
            }

            let payload = serde_json::json!({
                "clientcode": self.credentials.client_code,
                "password": self.credentials.pin,
                "totp": self.credentials.totp,
            });

            let request = HttpRequest::post(format!("{}{}", self.base_url, LOGIN_PATH))
                .with_json_body(payload.to_string())
                .with_header("X-PrivateKey", &self.credentials.api_key)
                .with_timeout_ms(10_000);

            let response = self.execute(request).await?;
            let parsed: LoginEnvelope = serde_json::from_str(&response.body).map_err(|e| {
                ProviderError::unclassified(format!("malformed login response: {e}"))
            })?;

            if !parsed.status {
                return Err(classify_api_error(
                    parsed.errorcode.as_deref(),
                    parsed.message.as_deref().unwrap_or("login rejected"),
                ));
            }

            let data = parsed.data.ok_or_else(|| {
                ProviderError::unclassified("login response missing session data")
            })?;

            let info = SessionInfo {
                auth_token: data.jwt_token,
                feed_token: data.feed_token,
                established_at: UtcDateTime::now(),
            };
            self.store_session(info.clone());
            Ok(info)
        })
    }

    fn invalidate_session(&self) {
        let mut guard = self
            .session
            .lock()
            .expect("session cache should not be poisoned");
        *guard = None;
    }
}

impl HistoricalSource for AngelOneAdapter {
    fn daily_series(
        &self,
        req: SeriesRequest,
    ) -> Pin<Box<dyn Future<Output = Result<PriceSeries, ProviderError>> + Send + '_>> {
        Box::pin(async move {
            if self.mock_mode {
                return mock_series(&req.instrument);
            }

            let (bearer, api_key) = self.auth_for_secure_call()?;

            let to_date = UtcDateTime::now();
            let from_date = to_date.days_back(req.lookback_days);
            let payload = serde_json::json!({
                "exchange": "NSE",
                "symboltoken": req.instrument.token.as_str(),
                "interval": "ONE_DAY",
                "fromdate": from_date.format_minute(),
                "todate": to_date.format_minute(),
            });

            let request = HttpRequest::post(format!("{}{}", self.base_url, CANDLES_PATH))
                .with_json_body(payload.to_string())
                .with_auth(&bearer)
                .with_auth(&api_key)
                .with_timeout_ms(10_000);

            let response = self.execute(request).await?;
            let parsed: CandleEnvelope = serde_json::from_str(&response.body).map_err(|e| {
                ProviderError::unclassified(format!("malformed candle response: {e}"))
            })?;

            if !parsed.status {
                return Err(classify_api_error(
                    parsed.errorcode.as_deref(),
                    parsed.message.as_deref().unwrap_or("candle request rejected"),
                ));
            }

            let rows = parsed.data.unwrap_or_default();
            if rows.is_empty() {
                return Err(ProviderError::transient(format!(
                    "upstream returned no candles for {}",
                    req.instrument.symbol
                )));
            }

            let candles = rows
                .iter()
                .map(|row| normalize_candle(row))
                .collect::<Result<Vec<_>, _>>()?;

            PriceSeries::new(req.instrument.symbol.clone(), candles)
                .map_err(|e| ProviderError::unclassified(format!("invalid candle series: {e}")))
        })
    }
}

impl UniverseSource for AngelOneAdapter {
    fn tradable_instruments(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Instrument>, ProviderError>> + Send + '_>> {
        Box::pin(async move {
            if self.mock_mode {
                return Ok(mock_universe());
            }

            let request = HttpRequest::get(format!("{}{}", self.base_url, SCRIP_MASTER_PATH))
                .with_timeout_ms(30_000);

            let response = self.execute(request).await?;
            let entries: Vec<ScripEntry> = serde_json::from_str(&response.body).map_err(|e| {
                ProviderError::unclassified(format!("malformed scrip master: {e}"))
            })?;

            let mut instruments = Vec::new();
            for entry in entries {
                if !entry.is_cash_equity() {
                    continue;
                }
                let Some(instrument) = entry.into_instrument() else {
                    continue;
                };
                instruments.push(instrument);
            }

            Ok(instruments)
        })
    }
}

/// The tick websocket is owned by the embedding process, which authenticates
/// it with the feed token from [`SessionProvider::ensure_session`] and pushes
/// the token set itself. `subscribe` here is the scheduler-facing gate: it
/// confirms a feed-capable session exists so the scheduler surfaces
/// `SessionInvalid` before the embedding process wires up a doomed socket.
impl RealtimeFeed for AngelOneAdapter {
    fn subscribe(
        &self,
        tokens: &[InstrumentToken],
    ) -> Pin<Box<dyn Future<Output = Result<(), ProviderError>> + Send + '_>> {
        let empty = tokens.is_empty();
        Box::pin(async move {
            if self.mock_mode || empty {
                return Ok(());
            }

            let session = self.cached_session().ok_or_else(|| {
                ProviderError::session_invalid("cannot subscribe without a feed session")
            })?;

            if session.feed_token.is_empty() {
                return Err(ProviderError::session_invalid(
                    "session carries no feed token",
                ));
            }

            Ok(())
        })
    }
}

/// Map the upstream's documented error codes onto the taxonomy.
fn classify_api_error(errorcode: Option<&str>, message: &str) -> ProviderError {
    match errorcode {
        // AG8001/AG8002: invalid/expired token. AB8050/AB8051: stale session.
        Some("AG8001") | Some("AG8002") | Some("AB8050") | Some("AB8051") => {
            ProviderError::session_invalid(format!("{message} ({})", errorcode.unwrap_or("")))
        }
        // AB1004: access rate exceeded.
        Some("AB1004") => ProviderError::rate_limited(message.to_owned()),
        Some(code) => ProviderError::unclassified(format!("{message} ({code})")),
        None => ProviderError::unclassified(message.to_owned()),
    }
}

#[derive(Debug, Deserialize)]
struct LoginEnvelope {
    status: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    errorcode: Option<String>,
    #[serde(default)]
    data: Option<LoginData>,
}

#[derive(Debug, Deserialize)]
struct LoginData {
    #[serde(rename = "jwtToken")]
    jwt_token: String,
    #[serde(rename = "feedToken")]
    feed_token: String,
}

#[derive(Debug, Deserialize)]
struct CandleEnvelope {
    status: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    errorcode: Option<String>,
    #[serde(default)]
    data: Option<Vec<CandleRow>>,
}

/// One upstream candle row: `[timestamp, open, high, low, close, volume]`.
#[derive(Debug, Deserialize)]
struct CandleRow(String, f64, f64, f64, f64, u64);

#[derive(Debug, Deserialize)]
struct ScripEntry {
    token: String,
    symbol: String,
    #[serde(default)]
    instrumenttype: String,
    #[serde(default)]
    exch_seg: String,
}

impl ScripEntry {
    /// Cash-segment equity rows: NSE segment, `-EQ` series suffix, and no
    /// derivative instrument type.
    fn is_cash_equity(&self) -> bool {
        self.exch_seg == "NSE" && self.instrumenttype.is_empty() && self.symbol.ends_with("-EQ")
    }

    fn into_instrument(self) -> Option<Instrument> {
        let trimmed = self.symbol.trim_end_matches("-EQ");
        let symbol = Symbol::parse(trimmed).ok()?;
        let token = InstrumentToken::parse(&self.token).ok()?;
        Some(Instrument::new(symbol, token))
    }
}

/// Upstream rows carry exchange-local timestamps; the series stores UTC.
fn normalize_candle(row: &CandleRow) -> Result<Candle, ProviderError> {
    let ts = UtcDateTime::parse_offset(&row.0).map_err(validation_to_error)?;
    Candle::new(ts, row.1, row.2, row.3, row.4, Some(row.5)).map_err(validation_to_error)
}

fn validation_to_error(error: ValidationError) -> ProviderError {
    ProviderError::unclassified(error.to_string())
}

// ============================================================================
// Deterministic mock data
// ============================================================================

fn symbol_seed(symbol: &Symbol) -> u64 {
    symbol.as_str().bytes().fold(13_u64, |acc, byte| {
        acc.wrapping_mul(29).wrapping_add(byte as u64)
    })
}

/// Seeded daily series long enough for every breakout window.
fn mock_series(instrument: &Instrument) -> Result<PriceSeries, ProviderError> {
    let seed = symbol_seed(&instrument.symbol);
    let sessions: u32 = 280;
    let now = UtcDateTime::now();
    let mut candles = Vec::with_capacity(sessions as usize);

    for index in 0..sessions {
        let ts = now.days_back(sessions - index);

        let base = 200.0 + ((seed + u64::from(index) * 7) % 900) as f64 / 10.0;
        let close = base + 0.4;
        let open = base - 0.3;
        let candle = Candle::new(ts, open, close + 1.1, open - 0.9, close, Some(50_000))
            .map_err(validation_to_error)?;
        candles.push(candle);
    }

    PriceSeries::new(instrument.symbol.clone(), candles)
        .map_err(|e| ProviderError::unclassified(e.to_string()))
}

fn mock_universe() -> Vec<Instrument> {
    let seedlist = [
        ("SBIN", "3045"),
        ("RELIANCE", "2885"),
        ("INFY", "1594"),
        ("TCS", "11536"),
        ("HDFCBANK", "1333"),
        ("TATAMOTORS", "3456"),
    ];

    seedlist
        .iter()
        .filter_map(|(symbol, token)| {
            let symbol = Symbol::parse(symbol).ok()?;
            let token = InstrumentToken::parse(token).ok()?;
            Some(Instrument::new(symbol, token))
        })
        .collect()
}
