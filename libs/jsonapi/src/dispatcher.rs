//! Request dispatch: (method, id) → operation → provider/validator/projection.

use axum::body::Bytes;
use http::{Method, StatusCode};
use serde_json::Value;
use tracing::{debug, error, info, instrument};

use crate::descriptor::ResourceDescriptor;
use crate::envelope::{Envelope, PageMeta};
use crate::error::{ApiError, ValidationFailure};
use crate::problem::{Fault, Problem};
use crate::projection::{project, project_all};
use crate::provider::{CollectionProvider, QueryLog};
use crate::query::{QueryParams, QuerySpec};
use crate::record::FieldSource;
use crate::resource::ResourceSettings;
use crate::validation::FieldErrors;
use crate::value::RecordId;

/// What a request asks for, decided from its method and path shape alone.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Operation {
    List,
    Create,
    Retrieve(String),
    Update(String),
    Delete(String),
}

impl Operation {
    /// Index paths accept GET and POST; item paths GET, PUT and DELETE.
    pub fn resolve(method: &Method, id: Option<&str>) -> Result<Self, ApiError> {
        match (id, method) {
            (None, &Method::GET) => Ok(Self::List),
            (None, &Method::POST) => Ok(Self::Create),
            (Some(id), &Method::GET) => Ok(Self::Retrieve(id.to_string())),
            (Some(id), &Method::PUT) => Ok(Self::Update(id.to_string())),
            (Some(id), &Method::DELETE) => Ok(Self::Delete(id.to_string())),
            (None, m) => Err(ApiError::not_allowed(format!("{m} on collection"))),
            (Some(_), m) => Err(ApiError::not_allowed(format!("{m} on item"))),
        }
    }
}

/// Transport-neutral request handed to a resource.
#[derive(Clone, Debug)]
pub struct ApiRequest {
    pub method: Method,
    pub id: Option<String>,
    pub query: QueryParams,
    pub body: Bytes,
}

impl ApiRequest {
    pub fn new(method: Method, id: Option<&str>) -> Self {
        Self {
            method,
            id: id.map(str::to_string),
            query: QueryParams::default(),
            body: Bytes::new(),
        }
    }

    pub fn with_query(mut self, raw: &str) -> Self {
        self.query = QueryParams::parse(raw);
        self
    }

    pub fn with_json(mut self, body: &Value) -> Self {
        self.body = Bytes::from(body.to_string());
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ResponseBody {
    Empty,
    Json(Value),
    Problem(Problem),
}

#[derive(Clone, Debug, PartialEq)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: ResponseBody,
}

impl ApiResponse {
    pub fn json(status: StatusCode, body: Value) -> Self {
        Self {
            status,
            body: ResponseBody::Json(body),
        }
    }

    pub fn empty(status: StatusCode) -> Self {
        Self {
            status,
            body: ResponseBody::Empty,
        }
    }

    pub fn problem(problem: Problem) -> Self {
        Self {
            status: problem.status_code(),
            body: ResponseBody::Problem(problem),
        }
    }

    /// JSON body, if the response carries one.
    pub fn json_body(&self) -> Option<&Value> {
        match &self.body {
            ResponseBody::Json(v) => Some(v),
            _ => None,
        }
    }
}

fn parse_id(raw: &str) -> Result<RecordId, ApiError> {
    raw.trim().parse().map_err(|_| ApiError::not_found(raw))
}

/// One request's view of a resource: its descriptor, provider and a settings
/// snapshot taken when the request arrived.
pub struct Dispatcher<'a, P: CollectionProvider> {
    pub descriptor: &'a ResourceDescriptor,
    pub provider: &'a P,
    pub settings: &'a ResourceSettings,
}

impl<'a, P: CollectionProvider> Dispatcher<'a, P> {
    pub fn new(
        descriptor: &'a ResourceDescriptor,
        provider: &'a P,
        settings: &'a ResourceSettings,
    ) -> Self {
        Self {
            descriptor,
            provider,
            settings,
        }
    }

    #[instrument(
        name = "jsonapi.dispatch",
        skip_all,
        fields(resource = %self.descriptor.name, method = %request.method, id = request.id.as_deref().unwrap_or(""))
    )]
    pub async fn dispatch(&self, request: ApiRequest) -> ApiResponse {
        match self.run(request).await {
            Ok(resp) => {
                debug!(status = resp.status.as_u16(), "request served");
                resp
            }
            Err(err) => self.error_response(err),
        }
    }

    async fn run(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        match Operation::resolve(&request.method, request.id.as_deref())? {
            Operation::List => self.list(&request.query).await,
            Operation::Create => self.create(&request.body).await,
            Operation::Retrieve(id) => self.retrieve(&id).await,
            Operation::Update(id) => self.update(&id, &request.body).await,
            Operation::Delete(id) => self.delete(&id).await,
        }
    }

    fn error_response(&self, err: ApiError) -> ApiResponse {
        match err {
            ApiError::Invalid(failure) => {
                let body = failure.to_json();
                debug!(errors = %body, "payload rejected");
                ApiResponse::json(StatusCode::BAD_REQUEST, body)
            }
            err if err.is_internal() => {
                error!(error = %err, "request failed");
                let fault = match err {
                    ApiError::Serialization(_) => Fault::Serialization,
                    _ => Fault::Provider,
                };
                ApiResponse::problem(Problem::fault(fault, &self.descriptor.name))
            }
            err => {
                debug!(error = %err, status = err.status().as_u16(), "request rejected");
                ApiResponse::empty(err.status())
            }
        }
    }

    /// Value under the resource key of a JSON object body.
    fn payload(&self, body: &[u8]) -> Result<Value, ApiError> {
        let parsed: Value = serde_json::from_slice(body)
            .map_err(|_| ApiError::structural(&self.descriptor.name))?;
        match parsed {
            Value::Object(mut map) => map
                .remove(&self.descriptor.name)
                .ok_or_else(|| ApiError::structural(&self.descriptor.name)),
            _ => Err(ApiError::structural(&self.descriptor.name)),
        }
    }

    async fn find(&self, raw_id: &str) -> Result<P::Record, ApiError> {
        let id = parse_id(raw_id)?;
        self.provider
            .get_by_id(id)
            .await?
            .ok_or_else(|| ApiError::not_found_id(id))
    }

    async fn list(&self, params: &QueryParams) -> Result<ApiResponse, ApiError> {
        let spec = QuerySpec::translate(self.descriptor, params, self.settings.default_per_page);
        let log = QueryLog::new(self.settings.debug);

        let selection = self
            .provider
            .select(&spec.filters, spec.sort.as_ref(), &log)
            .await?;
        let total = self.provider.count(&selection, &log).await?;
        let records = self.provider.paginate(selection, &spec.page, &log).await?;
        let items = project_all(&records, &self.descriptor.fields)?;
        debug!(total, returned = items.len(), page = spec.page.page, "listed");

        let meta = PageMeta {
            total,
            per_page: spec.page.per_page,
            page: spec.page.page,
        };
        let queries = log.is_enabled().then(|| log.entries());
        let envelope = Envelope::many(&self.descriptor.name, items).with_meta(
            meta,
            &self.settings.metadata,
            queries,
        );
        Ok(ApiResponse::json(StatusCode::OK, envelope.into_json()))
    }

    async fn retrieve(&self, raw_id: &str) -> Result<ApiResponse, ApiError> {
        let record = self.find(raw_id).await?;
        let item = project(&record, &self.descriptor.fields)?;
        Ok(ApiResponse::json(
            StatusCode::OK,
            Envelope::single(&self.descriptor.name, item).into_json(),
        ))
    }

    async fn create(&self, body: &[u8]) -> Result<ApiResponse, ApiError> {
        let validator = self
            .settings
            .create_validator
            .clone()
            .ok_or_else(|| ApiError::not_allowed("create"))?;
        let items = match self.payload(body)? {
            Value::Array(items) => items,
            single => vec![single],
        };

        let mut cleaned = Vec::with_capacity(items.len());
        let mut errors = Vec::with_capacity(items.len());
        let mut rejected = false;
        for item in &items {
            match validator.validate(item, None) {
                Ok(data) => {
                    cleaned.push(data);
                    errors.push(FieldErrors::new());
                }
                Err(e) => {
                    rejected = true;
                    errors.push(e);
                }
            }
        }
        if rejected {
            return Err(ApiError::Invalid(ValidationFailure::Batch(errors)));
        }
        for (i, data) in cleaned.iter().enumerate() {
            let clash = self.provider.conflicts(data, &cleaned[..i], None).await?;
            if !clash.is_empty() {
                rejected = true;
                errors[i] = clash;
            }
        }
        if rejected {
            return Err(ApiError::Invalid(ValidationFailure::Batch(errors)));
        }

        let mut created = Vec::with_capacity(cleaned.len());
        for data in cleaned {
            let record = self.provider.create(data).await?;
            created.push(Value::Object(project(&record, &self.descriptor.fields)?));
        }
        info!(count = created.len(), "records created");
        Ok(ApiResponse::json(
            StatusCode::OK,
            Envelope::many(&self.descriptor.name, created).into_json(),
        ))
    }

    async fn update(&self, raw_id: &str, body: &[u8]) -> Result<ApiResponse, ApiError> {
        let validator = self
            .settings
            .update_validator
            .clone()
            .ok_or_else(|| ApiError::not_allowed("update"))?;
        let record = self.find(raw_id).await?;
        let payload = self.payload(body)?;
        let data = validator
            .validate(&payload, Some(&record as &dyn FieldSource))
            .map_err(|e| ApiError::Invalid(ValidationFailure::Single(e)))?;
        let clash = self.provider.conflicts(&data, &[], Some(&record)).await?;
        if !clash.is_empty() {
            return Err(ApiError::Invalid(ValidationFailure::Single(clash)));
        }

        let updated = self.provider.update(record, data).await?;
        info!(id = raw_id, "record updated");
        let item = project(&updated, &self.descriptor.fields)?;
        Ok(ApiResponse::json(
            StatusCode::OK,
            Envelope::single(&self.descriptor.name, item).into_json(),
        ))
    }

    async fn delete(&self, raw_id: &str) -> Result<ApiResponse, ApiError> {
        let record = self.find(raw_id).await?;
        self.provider.delete(record).await?;
        info!(id = raw_id, "record deleted");
        Ok(ApiResponse::empty(StatusCode::ACCEPTED))
    }
}
