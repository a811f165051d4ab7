//! HTTP over AT.
//!
//! Each request is a linear sequence on the modem's single HTTP session:
//! `HTTPINIT`, bearer and URL parameters, optional body upload, `HTTPACTION`,
//! body read and finally `HTTPTERM`. The session is terminated on every exit
//! path once `HTTPINIT` succeeded.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_time::{Duration, Timer};
use embedded_io_async::{Read, ReadReady, Write};

use crate::asynch::session::{Terminator, Transaction, RX_BUF_SIZE};
use crate::asynch::Supervisor;
use crate::command::http::responses::{
    read_body, HttpActionResult, ACTION_PREFIX, DOWNLOAD, READ_DONE,
};
use crate::command::http::types::HttpMethod;
use crate::command::http::{
    HttpAction, HttpData, HttpInit, HttpRead, HttpTerm, SetHttpBearer, SetHttpContentType,
    SetHttpUrl,
};
use crate::command::OK;
use crate::config::ModemConfig;
use crate::error::Error;

/// Time the modem waits for the announced POST body
const UPLOAD_TIME_MS: u32 = 10_000;
const ACTION_BUF_SIZE: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HttpResponse {
    pub status: u16,
    /// Body length announced by the server
    pub content_len: usize,
    /// Body bytes copied to the caller's buffer
    pub body_len: usize,
    pub truncated: bool,
}

pub struct HttpClient<'s, 'a, M: RawMutex, T, C> {
    supervisor: &'s Supervisor<'a, M, T, C>,
}

impl<'s, 'a, M, T, C> HttpClient<'s, 'a, M, T, C>
where
    M: RawMutex,
    T: Read + ReadReady + Write,
    C: ModemConfig,
{
    pub fn new(supervisor: &'s Supervisor<'a, M, T, C>) -> Self {
        Self { supervisor }
    }

    pub async fn get(&self, url: &str, body: &mut [u8]) -> Result<HttpResponse, Error> {
        self.request(HttpMethod::Get, url, None, body).await
    }

    pub async fn post(
        &self,
        url: &str,
        content_type: &str,
        payload: &[u8],
        body: &mut [u8],
    ) -> Result<HttpResponse, Error> {
        self.request(HttpMethod::Post, url, Some((content_type, payload)), body)
            .await
    }

    async fn request(
        &self,
        method: HttpMethod,
        url: &str,
        upload: Option<(&str, &[u8])>,
        body: &mut [u8],
    ) -> Result<HttpResponse, Error> {
        self.supervisor.base_check().await?;
        self.supervisor.activate_data_context().await?;

        let session = self.supervisor.session();
        session
            .send(&HttpInit, OK)
            .await
            .inspect_err(|_| error!("HTTPINIT failed"))?;

        let res = self.perform(method, url, upload, body).await;

        if let Err(e) = session.send(&HttpTerm, OK).await {
            warn!("HTTPTERM failed: {:?}", e);
        }
        Timer::after(C::HTTP_TERM_SETTLE).await;

        res
    }

    async fn perform(
        &self,
        method: HttpMethod,
        url: &str,
        upload: Option<(&str, &[u8])>,
        body: &mut [u8],
    ) -> Result<HttpResponse, Error> {
        let session = self.supervisor.session();

        session
            .send(&SetHttpBearer { cid: C::CONTEXT_ID }, OK)
            .await
            .inspect_err(|_| error!("Setting HTTP bearer failed"))?;
        session
            .send(&SetHttpUrl { url }, OK)
            .await
            .inspect_err(|_| error!("Setting HTTP URL failed"))?;

        if let Some((content_type, payload)) = upload {
            session
                .send(&SetHttpContentType { content_type }, OK)
                .await
                .inspect_err(|_| error!("Setting content type failed"))?;
            session
                .send(
                    &HttpData {
                        len: payload.len(),
                        input_time_ms: UPLOAD_TIME_MS,
                    },
                    DOWNLOAD,
                )
                .await
                .inspect_err(|_| error!("HTTPDATA was not accepted"))?;

            let tx = Transaction::new(
                payload,
                OK,
                Duration::from_millis(u64::from(UPLOAD_TIME_MS)),
            )
            .with_terminator(Terminator::None);
            session
                .execute(&tx, None)
                .await
                .inspect_err(|_| error!("Uploading request body failed"))?;
        }

        let mut buf = [0u8; ACTION_BUF_SIZE];
        let res = session
            .send_into(&HttpAction { method }, ACTION_PREFIX, &mut buf)
            .await
            .inspect_err(|_| error!("HTTPACTION failed"))?;
        let raw = core::str::from_utf8(&buf[..res.len]).map_err(|_| Error::MalformedResponse)?;
        let action = HttpActionResult::scan(raw)
            .inspect_err(|_| error!("Malformed HTTPACTION result"))?;
        debug!(
            "HTTP {:?} status {} length {}",
            method, action.status, action.len
        );

        let mut response = HttpResponse {
            status: action.status,
            content_len: action.len,
            body_len: 0,
            truncated: false,
        };
        if action.len == 0 {
            return Ok(response);
        }

        let mut rx = [0u8; RX_BUF_SIZE];
        let read = session
            .send_into(
                &HttpRead {
                    offset: 0,
                    len: action.len,
                },
                READ_DONE,
                &mut rx,
            )
            .await
            .inspect_err(|_| error!("HTTPREAD failed"))?;
        let content = read_body(&rx[..read.len])?;

        let len = content.len().min(body.len());
        body[..len].copy_from_slice(&content[..len]);
        response.body_len = len;
        response.truncated = read.truncated || len < action.len;

        Ok(response)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::asynch::Session;
    use crate::test_helpers::{base_replies, setup_logger, MockModem, TestConfig};
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;

    fn count(modem: &MockModem, prefix: &[u8]) -> usize {
        modem
            .writes()
            .iter()
            .filter(|w| w.starts_with(prefix))
            .count()
    }

    fn http_replies(modem: &MockModem) {
        base_replies(modem);
        modem.on("AT+HTTPINIT", "\r\nOK\r\n");
        modem.on("AT+HTTPPARA", "\r\nOK\r\n");
        modem.on("AT+HTTPTERM", "\r\nOK\r\n");
    }

    #[tokio::test]
    async fn get_reads_announced_length() {
        setup_logger();
        let modem = MockModem::new();
        http_replies(&modem);
        modem.on("AT+HTTPACTION=0", "\r\nOK\r\n\r\n+HTTPACTION: 0,200,37\r\n");
        modem.on(
            "AT+HTTPREAD=0,37",
            "\r\n+HTTPREAD: 37\r\n{\"code\":200,\"msg\":\"ok\",\"data\":123456}\r\nOK\r\n",
        );

        let session: Session<NoopRawMutex, _> = Session::new(modem.clone());
        session.init();
        let supervisor = Supervisor::new(&session, TestConfig::new(&modem));
        let http = HttpClient::new(&supervisor);

        let mut body = [0u8; 128];
        let res = http.get("http://example.com/time", &mut body).await.unwrap();

        assert_eq!(res.status, 200);
        assert_eq!(res.content_len, 37);
        assert_eq!(&body[..res.body_len], br#"{"code":200,"msg":"ok","data":123456}"#);
        assert_eq!(count(&modem, b"AT+HTTPREAD"), 1);
        assert_eq!(count(&modem, b"AT+HTTPREAD=0,37\r\n"), 1);
        assert_eq!(count(&modem, b"AT+HTTPTERM"), 1);
        assert_eq!(
            count(&modem, b"AT+HTTPPARA=\"URL\",\"http://example.com/time\""),
            1
        );
    }

    #[tokio::test]
    async fn get_survives_short_reads() {
        setup_logger();
        let modem = MockModem::new();
        modem.set_read_limit(16);
        http_replies(&modem);
        modem.on("AT+HTTPACTION=0", "\r\nOK\r\n\r\n+HTTPACTION: 0,200,37\r\n");
        modem.on(
            "AT+HTTPREAD=0,37",
            "\r\n+HTTPREAD: 37\r\n{\"code\":200,\"msg\":\"ok\",\"data\":123456}\r\nOK\r\n",
        );

        let session: Session<NoopRawMutex, _> = Session::new(modem.clone());
        session.init();
        let supervisor = Supervisor::new(&session, TestConfig::new(&modem));
        let http = HttpClient::new(&supervisor);

        let mut body = [0u8; 128];
        let res = http.get("http://example.com/time", &mut body).await.unwrap();

        assert_eq!(res.content_len, 37);
        assert!(!res.truncated);
        assert_eq!(&body[..res.body_len], br#"{"code":200,"msg":"ok","data":123456}"#);
        assert_eq!(count(&modem, b"AT+HTTPREAD=0,37\r\n"), 1);
    }

    #[tokio::test]
    async fn long_body_is_truncated() {
        setup_logger();
        let modem = MockModem::new();
        http_replies(&modem);
        modem.on("AT+HTTPACTION=0", "\r\nOK\r\n\r\n+HTTPACTION: 0,200,1500\r\n");
        let reply = format!("\r\n+HTTPREAD: 1500\r\n{}\r\nOK\r\n", "x".repeat(1500));
        modem.on("AT+HTTPREAD=0,1500", &reply);

        let session: Session<NoopRawMutex, _> = Session::new(modem.clone());
        session.init();
        let supervisor = Supervisor::new(&session, TestConfig::new(&modem));
        let http = HttpClient::new(&supervisor);

        let mut body = [0u8; 256];
        let res = http.get("http://example.com/big", &mut body).await.unwrap();

        assert_eq!(res.status, 200);
        assert_eq!(res.content_len, 1500);
        assert_eq!(res.body_len, 256);
        assert!(res.truncated);
        assert!(body.iter().all(|&b| b == b'x'));
        assert_eq!(count(&modem, b"AT+HTTPTERM"), 1);
    }

    #[tokio::test]
    async fn malformed_action_still_terminates() {
        setup_logger();
        let modem = MockModem::new();
        http_replies(&modem);
        modem.on("AT+HTTPACTION=0", "\r\nOK\r\n\r\n+HTTPACTION: 0,200\r\n");

        let session: Session<NoopRawMutex, _> = Session::new(modem.clone());
        session.init();
        let supervisor = Supervisor::new(&session, TestConfig::new(&modem));
        let http = HttpClient::new(&supervisor);

        let mut body = [0u8; 64];
        assert_eq!(
            http.get("http://example.com", &mut body).await,
            Err(Error::MalformedResponse)
        );
        assert_eq!(count(&modem, b"AT+HTTPREAD"), 0);
        assert_eq!(count(&modem, b"AT+HTTPTERM"), 1);
    }

    #[tokio::test]
    async fn empty_body_is_not_read() {
        setup_logger();
        let modem = MockModem::new();
        http_replies(&modem);
        modem.on("AT+HTTPACTION=0", "\r\nOK\r\n\r\n+HTTPACTION: 0,204,0\r\n");

        let session: Session<NoopRawMutex, _> = Session::new(modem.clone());
        session.init();
        let supervisor = Supervisor::new(&session, TestConfig::new(&modem));
        let http = HttpClient::new(&supervisor);

        let mut body = [0u8; 64];
        let res = http.get("http://example.com", &mut body).await.unwrap();
        assert_eq!(res.status, 204);
        assert_eq!(res.body_len, 0);
        assert_eq!(count(&modem, b"AT+HTTPREAD"), 0);
    }

    #[tokio::test]
    async fn post_uploads_body_without_terminator() {
        setup_logger();
        let modem = MockModem::new();
        http_replies(&modem);
        modem.on("AT+HTTPDATA=9,10000", "\r\nDOWNLOAD\r\n");
        modem.on("{\"a\":\"b\"}", "\r\nOK\r\n");
        modem.on("AT+HTTPACTION=1", "\r\nOK\r\n\r\n+HTTPACTION: 1,200,2\r\n");
        modem.on("AT+HTTPREAD=0,2", "\r\n+HTTPREAD: 2\r\n{}\r\nOK\r\n");

        let session: Session<NoopRawMutex, _> = Session::new(modem.clone());
        session.init();
        let supervisor = Supervisor::new(&session, TestConfig::new(&modem));
        let http = HttpClient::new(&supervisor);

        let mut body = [0u8; 4];
        let res = http
            .post(
                "http://example.com/api",
                "application/json",
                br#"{"a":"b"}"#,
                &mut body,
            )
            .await
            .unwrap();

        assert_eq!(res.status, 200);
        assert_eq!(&body[..res.body_len], b"{}");

        let writes = modem.writes();
        let upload = writes
            .iter()
            .position(|w| w.as_slice() == br#"{"a":"b"}"#)
            .unwrap();
        assert!(writes[upload - 1].starts_with(b"AT+HTTPDATA=9,10000"));
        assert!(writes[upload + 1].starts_with(b"AT+HTTPACTION=1"));
        assert_eq!(
            count(&modem, b"AT+HTTPPARA=\"CONTENT\",\"application/json\""),
            1
        );
    }

    #[tokio::test]
    async fn failed_init_skips_terminate() {
        setup_logger();
        let modem = MockModem::new();
        base_replies(&modem);
        modem.on("AT+HTTPINIT", "\r\nERROR\r\n");

        let session: Session<NoopRawMutex, _> = Session::new(modem.clone());
        session.init();
        let supervisor = Supervisor::new(&session, TestConfig::new(&modem));
        let http = HttpClient::new(&supervisor);

        let mut body = [0u8; 64];
        assert_eq!(
            http.get("http://example.com", &mut body).await,
            Err(Error::Timeout)
        );
        assert_eq!(count(&modem, b"AT+HTTPTERM"), 0);
    }
}
