//! Portal client: one end-to-end check-in attempt over a headless browser.

use std::time::Duration;

use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::handler::Handler;
use chromiumoxide::page::Page;
use chrono::{Local, NaiveDate, NaiveDateTime};
use futures_util::StreamExt;
use serde::de::DeserializeOwned;
use tokio::time::sleep;
use tracing::{debug, warn};

use dailyreport_scheduler::AttemptOutcome;

use crate::PortalError;

/// Portal landing page with the login form.
const LOGIN_URL: &str = "https://thos.tsinghua.edu.cn/";

/// Finished-applications view listing past submissions, newest first.
const FINISHED_URL: &str =
    "https://thos.tsinghua.edu.cn/fp/view?m=fp#act=fp/myserviceapply/indexFinish";

/// Application form for the daily health report.
const APPLY_URL: &str = "https://thos.tsinghua.edu.cn/fp/view?m=fp#from=hall&\
     serveID=b44e2daf-0ef6-4d11-a115-0eb0d397934f&act=fp/serveapply";

/// Service box shown on the landing page once login succeeds.
const SERVICE_BOX: &str = ".box[name='学生健康及出行情况报告']";

/// Name of the iframe hosting the report form.
const FORM_FRAME: &str = "formIframe";

/// Address field inside the form iframe that the portal pre-fills from the
/// previous report. Non-empty means the form finished loading.
const ADDRESS_FIELD: &str = "#MQXXSZ";

/// Drops the layui modal overlay that blocks clicks while it is up.
const REMOVE_SHADE: &str = "(() => { \
     const shade = document.getElementById('layui-layer-shade1'); \
     if (shade) shade.remove(); \
     return null; })()";

/// Bounded wait for page elements to appear.
const ELEMENT_TIMEOUT: Duration = Duration::from_secs(30);

/// Bounded wait for the form iframe to finish populating.
const FORM_READY_TIMEOUT: Duration = Duration::from_secs(30);

/// Increment between DOM probes.
const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Account credentials, bound at process start.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Client for the self-service portal.
///
/// Each [`attempt`](PortalClient::attempt) launches a fresh headless browser
/// and releases it on every exit path, so attempts are independent and
/// calling again after "already submitted" has no side effects.
#[derive(Clone)]
pub struct PortalClient {
    credentials: Credentials,
}

impl PortalClient {
    /// Create a client for the given account.
    pub fn new(credentials: Credentials) -> Self {
        Self { credentials }
    }

    /// One full login-check-submit sequence.
    ///
    /// Submission is only reported as [`AttemptOutcome::Submitted`] after the
    /// record list confirms it; the submit call's own completion is not
    /// trusted.
    #[tracing::instrument(skip(self))]
    pub async fn attempt(&self) -> Result<AttemptOutcome, PortalError> {
        let (mut browser, mut handler) = launch().await?;
        let events = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let outcome = self.drive(&browser).await;

        // Release the browser on both paths; a failure here is logged but
        // never overrides the attempt's own result.
        if let Err(error) = browser.close().await {
            warn!(error = %error, "failed to close browser");
        }
        if let Err(error) = browser.wait().await {
            warn!(error = %error, "failed to reap browser process");
        }
        events.abort();

        outcome
    }

    async fn drive(&self, browser: &Browser) -> Result<AttemptOutcome, PortalError> {
        let page = browser.new_page("about:blank").await?;

        self.login(&page).await?;

        if self.committed_today(&page).await? {
            debug!("today's report already on file");
            return Ok(AttemptOutcome::AlreadyDone);
        }

        self.submit(&page).await?;

        if !self.committed_today(&page).await? {
            return Err(PortalError::SubmitNotConfirmed);
        }
        Ok(AttemptOutcome::Submitted)
    }

    /// Sign in and verify the session, mapping the portal's error banner to a
    /// fatal authentication failure.
    async fn login(&self, page: &Page) -> Result<(), PortalError> {
        page.goto(LOGIN_URL).await?;
        wait_for(page, "#i_user").await?;

        page.find_element("#i_user")
            .await?
            .click()
            .await?
            .type_str(&self.credentials.username)
            .await?;
        page.find_element("#i_pass")
            .await?
            .click()
            .await?
            .type_str(&self.credentials.password)
            .await?;
        sleep(Duration::from_millis(100)).await;
        page.find_element(".btn").await?.click().await?;
        sleep(Duration::from_secs(2)).await;

        if probe(page, "#msg_note").await? {
            return Err(PortalError::AuthRejected);
        }
        // The service box only renders for an authenticated session.
        wait_for(page, SERVICE_BOX).await?;
        Ok(())
    }

    /// Whether the newest record in the finished-applications list carries
    /// today's date. An empty list reads as "not submitted".
    async fn committed_today(&self, page: &Page) -> Result<bool, PortalError> {
        page.goto(FINISHED_URL).await?;
        wait_for(page, ".apply-detail-outside").await?;

        let entry: Option<String> = eval(
            page,
            "(() => { \
                 const li = document.querySelector('.apply-detail-outside li'); \
                 return li ? li.textContent : null; })()",
        )
        .await?;

        match entry {
            None => Ok(false),
            Some(entry) => Ok(submitted_on(&entry)? == Local::now().date_naive()),
        }
    }

    /// Open the application form, wait for the portal to pre-fill it, and
    /// send it off.
    async fn submit(&self, page: &Page) -> Result<(), PortalError> {
        page.goto(APPLY_URL).await?;
        wait_for(page, "#formIframe").await?;

        let frame_probe = format!(
            "(() => {{ \
                 const f = document.querySelector('iframe[name=\"{FORM_FRAME}\"]'); \
                 return Boolean(f && f.contentDocument); }})()"
        );
        if !eval::<bool>(page, &frame_probe).await? {
            return Err(PortalError::FrameMissing {
                name: FORM_FRAME.to_string(),
            });
        }

        let read_address = format!(
            "(() => {{ \
                 const f = document.querySelector('iframe[name=\"{FORM_FRAME}\"]'); \
                 if (!f || !f.contentDocument) return null; \
                 const el = f.contentDocument.querySelector('{ADDRESS_FIELD}'); \
                 return el ? el.value : null; }})()"
        );

        let mut waited = Duration::ZERO;
        loop {
            if waited > FORM_READY_TIMEOUT {
                return Err(PortalError::FormNeverReady { waited });
            }
            sleep(POLL_INTERVAL).await;
            waited += POLL_INTERVAL;

            eval::<()>(page, REMOVE_SHADE).await?;

            let address: Option<String> = eval(page, &read_address).await?;
            if address.is_some_and(|value| !value.is_empty()) {
                break;
            }
        }

        sleep(Duration::from_millis(500)).await;
        page.find_element("#commit").await?.click().await?;
        page.wait_for_navigation().await?;
        sleep(Duration::from_secs(1)).await;
        Ok(())
    }
}

async fn launch() -> Result<(Browser, Handler), PortalError> {
    let config = BrowserConfig::builder()
        .arg("--no-sandbox")
        .arg("--disable-setuid-sandbox")
        .request_timeout(Duration::from_secs(30))
        .build()
        .map_err(PortalError::Launch)?;
    Ok(Browser::launch(config).await?)
}

/// Evaluate a script in the page and read its result back.
async fn eval<T: DeserializeOwned>(page: &Page, expr: &str) -> Result<T, PortalError> {
    page.evaluate(expr)
        .await?
        .into_value()
        .map_err(|e| PortalError::Script(e.to_string()))
}

/// Whether `selector` currently matches anything in the page.
async fn probe(page: &Page, selector: &str) -> Result<bool, PortalError> {
    let expr = format!("Boolean(document.querySelector({selector:?}))");
    eval(page, &expr).await
}

/// Poll until `selector` matches something, bounded by [`ELEMENT_TIMEOUT`].
async fn wait_for(page: &Page, selector: &str) -> Result<(), PortalError> {
    let mut waited = Duration::ZERO;
    loop {
        if probe(page, selector).await? {
            return Ok(());
        }
        if waited >= ELEMENT_TIMEOUT {
            return Err(PortalError::MissingElement {
                selector: selector.to_string(),
            });
        }
        sleep(POLL_INTERVAL).await;
        waited += POLL_INTERVAL;
    }
}

/// Parse the submission stamp out of a record like
/// `"申请时间：2022-04-01 07:12:33"` and return its calendar date.
fn submitted_on(entry: &str) -> Result<NaiveDate, PortalError> {
    let start = entry
        .find(|c: char| c.is_ascii_digit())
        .ok_or_else(|| PortalError::RecordFormat(entry.to_string()))?;
    NaiveDateTime::parse_from_str(entry[start..].trim(), "%Y-%m-%d %H:%M:%S")
        .map(|stamp| stamp.date())
        .map_err(|_| PortalError::RecordFormat(entry.to_string()))
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn record_stamp_parses_past_the_label() {
        let date = submitted_on("申请时间：2022-04-01 07:12:33").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2022, 4, 1).unwrap());
    }

    #[test]
    fn record_stamp_tolerates_surrounding_whitespace() {
        let date = submitted_on("申请时间：2022-12-31 23:59:59\n  ").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2022, 12, 31).unwrap());
    }

    #[test]
    fn record_without_a_stamp_is_rejected() {
        assert!(matches!(
            submitted_on("暂无记录"),
            Err(PortalError::RecordFormat(_))
        ));
        assert!(matches!(
            submitted_on("申请时间：yesterday"),
            Err(PortalError::RecordFormat(_))
        ));
    }

    #[test]
    fn selector_probe_is_quoted_for_javascript() {
        let expr = format!("Boolean(document.querySelector({SERVICE_BOX:?}))");
        assert_eq!(
            expr,
            "Boolean(document.querySelector(\".box[name='学生健康及出行情况报告']\"))"
        );
    }
}
