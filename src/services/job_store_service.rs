use async_trait::async_trait;
use sqlx::PgPool;

use crate::error::Result;
use crate::models::job::Job;
use crate::models::search::{SearchPage, SearchParams};
use crate::services::search_service::JobSource;

const JOB_COLUMNS: &str = "id, title, company, location, description, required_skills, \
     preferred_skills, salary, remote, job_type, industry, source, url, posted_at";

/// Primary hosted job store, first in source precedence. Keyword filtering is
/// a case-insensitive substring OR-match against title and description,
/// location is a substring match, industry/job type/remote are equality
/// filters. Pagination is limit/offset ordered by post date descending.
#[derive(Clone)]
pub struct JobStoreService {
    pool: PgPool,
}

impl JobStoreService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn query(&self, params: &SearchParams) -> Result<SearchPage> {
        let per_page = params.per_page();
        let offset = (params.page() - 1) * per_page;

        let mut filters = Vec::new();
        let mut args: Vec<String> = Vec::new();

        if let Some(keywords) = params.keywords.as_deref().filter(|k| !k.trim().is_empty()) {
            let first = args.len() + 1;
            let second = first + 1;
            filters.push(format!(
                "(title ILIKE ${} OR description ILIKE ${})",
                first, second
            ));
            args.push(format!("%{}%", keywords.trim()));
            args.push(format!("%{}%", keywords.trim()));
        }
        if let Some(location) = params.location.as_deref().filter(|l| !l.trim().is_empty()) {
            filters.push(format!("location ILIKE ${}", args.len() + 1));
            args.push(format!("%{}%", location.trim()));
        }
        if let Some(industry) = params.industry.as_deref() {
            filters.push(format!("industry = ${}", args.len() + 1));
            args.push(industry.to_string());
        }
        if let Some(job_type) = params.job_type.as_deref() {
            filters.push(format!("job_type = ${}", args.len() + 1));
            args.push(job_type.to_string());
        }
        if let Some(remote) = params.remote {
            filters.push(format!("remote = {}", if remote { "TRUE" } else { "FALSE" }));
        }

        let where_clause = if filters.is_empty() {
            "".to_string()
        } else {
            format!("WHERE {}", filters.join(" AND "))
        };

        let items_query = format!(
            "SELECT {} FROM jobs {} ORDER BY posted_at DESC NULLS LAST LIMIT ${} OFFSET ${}",
            JOB_COLUMNS,
            where_clause,
            args.len() + 1,
            args.len() + 2
        );
        let total_query = format!("SELECT COUNT(*) FROM jobs {}", where_clause);

        let mut items_statement = sqlx::query_as::<_, Job>(&items_query);
        for value in &args {
            items_statement = items_statement.bind(value);
        }
        items_statement = items_statement.bind(per_page).bind(offset);
        let jobs = items_statement.fetch_all(&self.pool).await?;

        let mut total_statement = sqlx::query_scalar::<_, i64>(&total_query);
        for value in &args {
            total_statement = total_statement.bind(value);
        }
        let total_jobs = total_statement.fetch_one(&self.pool).await?;

        let total_pages = ((total_jobs as f64) / (per_page as f64)).ceil() as i64;

        Ok(SearchPage {
            jobs,
            total_jobs,
            total_pages,
            current_page: params.page(),
            source: "primary".to_string(),
        })
    }
}

#[async_trait]
impl JobSource for JobStoreService {
    fn name(&self) -> &'static str {
        "primary"
    }

    async fn fetch_page(&self, params: &SearchParams) -> Result<SearchPage> {
        self.query(params).await
    }
}
