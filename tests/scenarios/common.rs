use saasbridge::client::Credentials;
use saasbridge::core::{LoadSink, Record};

pub const SALESFORCE_BASE: &str = "https://example.my.salesforce.com";
pub const CLICKUP_BASE: &str = "https://api.clickup.com/api/v2";

/// Route adapter logging to the test writer once per process.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn salesforce_credentials() -> Credentials {
    Credentials::new(SALESFORCE_BASE).with_access_token("00Dxx0000000000!token")
}

/// Sink that counts every call it receives.
#[derive(Debug, Default)]
pub struct CountingSink {
    pub records: Vec<Record>,
    pub more_calls: usize,
    pub errors: Vec<String>,
}

impl LoadSink for CountingSink {
    fn add_record(&mut self, record: Record) {
        self.records.push(record);
    }

    fn set_has_more_records(&mut self) {
        self.more_calls += 1;
    }

    fn add_error(&mut self, message: String) {
        self.errors.push(message);
    }
}
