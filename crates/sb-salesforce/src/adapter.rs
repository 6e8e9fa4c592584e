//! Salesforce load and save adapter.

use tracing::{debug, error, info, instrument};

use saasbridge_client::security::url as url_security;
use saasbridge_client::{Credentials, HttpRequest, Transport};
use saasbridge_core::{
    Coercer, CollectionMetadata, CompositeBatch, CompositeRequest, CompositeResponse,
    CompositeResults, Dialect, Error, FieldFlattener, FieldMappingTable, LoadRequest, LoadSink,
    MetadataView, Page, Record, RelationshipRule, Result, SaveRequest, TimestampFormat,
    CREATED_AT_FIELD, UNIQUE_KEY_FIELD, UPDATED_AT_FIELD,
};

use crate::soql::{ConditionCompiler, SoqlQuery};

/// Default REST API version.
pub const DEFAULT_API_VERSION: &str = "59.0";

/// Batch size used when a load request does not set one.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Prefix of every error reported through a sink or save request.
const ERROR_PREFIX: &str = "error making salesforce request: ";

/// Naming conventions of Salesforce records.
pub fn salesforce_dialect() -> Dialect {
    Dialect::new("Id")
        .with_default("Name", UNIQUE_KEY_FIELD)
        .with_default("CreatedDate", CREATED_AT_FIELD)
        .with_default("LastModifiedDate", UPDATED_AT_FIELD)
        .with_display_field("Name")
        .with_envelope_field("attributes")
        .with_relationship(RelationshipRule::CustomSuffix)
        .with_timestamps(TimestampFormat::Iso8601)
}

/// Exposes Salesforce sObjects as platform collections.
///
/// Loads run one SOQL query; saves run one all-or-none composite request.
///
/// # Example
///
/// ```rust,ignore
/// use saasbridge_client::{Credentials, HttpTransport};
/// use saasbridge_salesforce::SalesforceAdapter;
///
/// let creds = Credentials::new("https://myorg.my.salesforce.com").with_access_token(token);
/// let adapter = SalesforceAdapter::new(HttpTransport::new(&creds)?, creds);
///
/// let mut result = saasbridge_core::LoadResult::default();
/// adapter.load(&request, &mut result).await?;
/// ```
#[derive(Debug, Clone)]
pub struct SalesforceAdapter<T> {
    transport: T,
    credentials: Credentials,
    api_version: String,
    default_batch_size: Option<usize>,
    dialect: Dialect,
}

impl<T: Transport> SalesforceAdapter<T> {
    pub fn new(transport: T, credentials: Credentials) -> Self {
        Self {
            transport,
            credentials,
            api_version: DEFAULT_API_VERSION.to_string(),
            default_batch_size: Some(DEFAULT_BATCH_SIZE),
            dialect: salesforce_dialect(),
        }
    }

    /// Use a different REST API version (`"60.0"`).
    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    /// Batch size for loads that don't set one; `None` loads everything.
    pub fn with_default_batch_size(mut self, batch_size: Option<usize>) -> Self {
        self.default_batch_size = batch_size;
        self
    }

    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    pub fn dialect(&self) -> &Dialect {
        &self.dialect
    }

    fn services_path(&self) -> String {
        format!("/services/data/v{}", self.api_version)
    }

    fn page(&self, request: &LoadRequest) -> Page {
        Page::new(
            request.batch_size.or(self.default_batch_size),
            request.batch_number,
        )
    }

    /// SOQL text for a load request.
    pub fn build_query(&self, request: &LoadRequest) -> Result<String> {
        let collection = &request.collection_metadata;
        let sobject = sobject_name(collection)?;
        let metadata = request.metadata();
        let table = FieldMappingTable::build(collection, &self.dialect);

        let fields = FieldFlattener::new(&metadata, &self.dialect).flatten(&request.fields, collection);
        let mut query = SoqlQuery::new(sobject)?.select(fields);
        if request.fields.is_empty() {
            query = query.compact();
        }

        let filter = ConditionCompiler::new(collection, &table).compile(&request.conditions)?;
        query = query.filter(filter);

        for order in &request.order {
            if let Some(external) = table.external(&order.field) {
                query = query.order_by(external, order.desc);
            }
        }

        let page = self.page(request);
        Ok(query.limit(page.fetch_limit()).offset(page.offset()).build())
    }

    /// Run a load, emitting coerced records into `sink`.
    ///
    /// A non-success response is reported once through the sink and yields
    /// no records.
    #[instrument(skip(self, request, sink), fields(collection = %request.collection))]
    pub async fn load<S>(&self, request: &LoadRequest, sink: &mut S) -> Result<()>
    where
        S: LoadSink + ?Sized,
    {
        let base_url = self.credentials.require_base_url()?;
        let query = self.build_query(request)?;
        let page = self.page(request);
        info!(
            batch_number = page.batch_number(),
            batch_size = ?page.batch_size(),
            query = %query,
            "Running SOQL query"
        );

        let url = format!(
            "{}{}/query/?q={}",
            base_url,
            self.services_path(),
            url_security::encode_component(&query)
        );
        let response = self.transport.request(HttpRequest::get(url)).await?;
        debug!(code = response.code, status = %response.status, "Query response");

        if response.code != 200 {
            let message = response
                .error_message()
                .unwrap_or_else(|| response.status.clone());
            sink.add_error(format!("{}{}", ERROR_PREFIX, message));
            return Ok(());
        }

        let rows = match response.body.get("records").and_then(|r| r.as_array()) {
            Some(rows) => rows,
            None => {
                sink.add_error(format!("{}response has no records", ERROR_PREFIX));
                return Ok(());
            }
        };

        let metadata = request.metadata();
        let coercer = Coercer::new(&metadata, &self.dialect);
        let table = FieldMappingTable::build(&request.collection_metadata, &self.dialect);
        let emitted = page.assemble(
            rows.iter().filter_map(|row| row.as_object()),
            sink,
            |row| coercer.to_internal_with_table(row, &request.collection_metadata, &table),
        );
        debug!(emitted, "Assembled query results");
        Ok(())
    }

    /// The composite request a save would submit, or `None` when there is
    /// nothing to write.
    pub fn build_composite(&self, request: &SaveRequest) -> Result<Option<CompositeRequest>> {
        let batch = self.batch(request)?;
        Ok((!batch.is_empty()).then(|| batch.into_request()))
    }

    fn batch(&self, request: &SaveRequest) -> Result<CompositeBatch> {
        let collection = &request.collection_metadata;
        let sobject = sobject_name(collection)?;
        let resource = format!("{}/sobjects/{}", self.services_path(), sobject);

        let metadata = request.metadata();
        let coercer = Coercer::new(&metadata, &self.dialect);
        let table = FieldMappingTable::build(collection, &self.dialect);

        let mut batch = CompositeBatch::new(resource);
        for op in &request.deletes {
            batch.add_delete(op.id());
        }
        for op in &request.inserts {
            batch.add_insert(op.id(), coercer.to_external_with_table(op.all(), collection, &table, false));
        }
        for op in &request.updates {
            batch.add_update(op.id(), coercer.to_external_with_table(op.all(), collection, &table, true));
        }
        Ok(batch)
    }

    /// Run a save as one atomic composite request.
    ///
    /// A non-success response fails the whole batch with a single
    /// request-level error. Otherwise every operation gets its own outcome
    /// and successful writes are refreshed with the values read back.
    /// Operation ids that map to the same reference id are reported as
    /// request-level errors and nothing is sent.
    #[instrument(skip(self, request), fields(collection = %request.collection))]
    pub async fn save(&self, request: &mut SaveRequest) -> Result<()> {
        let base_url = self.credentials.require_base_url()?;
        let batch = self.batch(request)?;
        if batch.is_empty() {
            debug!("Nothing to save");
            return Ok(());
        }
        if !batch.collisions().is_empty() {
            for reference_id in batch.collisions() {
                error!(reference_id = %reference_id, "Composite reference ids are not unique");
                request.add_error(format!(
                    "{}duplicate composite reference id: {}",
                    ERROR_PREFIX, reference_id
                ));
            }
            return Ok(());
        }
        let composite = batch.into_request();
        info!(
            subrequests = composite.subrequests.len(),
            inserts = request.inserts.len(),
            updates = request.updates.len(),
            deletes = request.deletes.len(),
            "Submitting composite request"
        );

        let url = format!("{}{}/composite", base_url, self.services_path());
        let response = self
            .transport
            .request(HttpRequest::post(url).json(&composite)?)
            .await?;
        debug!(code = response.code, status = %response.status, "Composite response");

        if response.code != 200 {
            let message = response
                .error_message()
                .unwrap_or_else(|| response.status.clone());
            error!(code = response.code, message = %message, "Composite request failed");
            request.add_error(format!("{}{}", ERROR_PREFIX, message));
            return Ok(());
        }

        let results: CompositeResults = response.json::<CompositeResponse>()?.into();

        let collection = request.collection_metadata.clone();
        let related = request.related_metadata.clone();
        let metadata = MetadataView {
            primary: &collection,
            related: &related,
        };
        let coercer = Coercer::new(&metadata, &self.dialect);
        let table = FieldMappingTable::build(&collection, &self.dialect);
        results.apply(request, |row: &Record| {
            coercer.to_internal_with_table(row, &collection, &table)
        });
        Ok(())
    }
}

fn sobject_name(collection: &CollectionMetadata) -> Result<&str> {
    collection
        .external_name
        .as_deref()
        .filter(|name| !name.is_empty())
        .ok_or_else(|| Error::config(format!("collection {} has no external name", collection.key())))
}
