use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, warn};
use url::Url;

use crate::cache::SearchCache;
use crate::error::{Error, Result};
use crate::models::job::Job;
use crate::models::search::{Country, SearchPage, SearchParams};
use crate::services::search_service::JobSource;

/// Skill names translated to the job bank's checklist lookup codes. The
/// search keywords stay free text; skills travel as structured query
/// parameters instead of being smuggled into the keyword string.
const SKILL_LOOKUP_CODES: &[(&str, &str)] = &[
    ("logistics", "310105"),
    ("leadership", "310201"),
    ("project management", "310204"),
    ("security", "310302"),
    ("mechanics", "310410"),
    ("electronics", "310412"),
    ("communications", "310507"),
    ("operations", "310511"),
    ("driving", "310615"),
    ("first aid", "310703"),
];

pub fn skill_lookup_codes(skills: &[String]) -> Vec<&'static str> {
    skills
        .iter()
        .filter_map(|skill| {
            let lower = skill.to_lowercase();
            SKILL_LOOKUP_CODES
                .iter()
                .find(|(name, _)| lower.contains(name))
                .map(|(_, code)| *code)
        })
        .collect()
}

/// Parameters of one job-bank page fetch; also the proxy's cache key basis.
#[derive(Debug, Clone, Default)]
pub struct JobBankQuery {
    pub keywords: Option<String>,
    pub location: Option<String>,
    pub distance: Option<u32>,
    pub page: i64,
    pub skills: Vec<String>,
}

impl JobBankQuery {
    fn cache_params(&self) -> SearchParams {
        SearchParams {
            keywords: self.keywords.clone(),
            location: self.location.clone(),
            radius_km: self.distance,
            country: Country::Canada,
            skills: self.skills.clone(),
            page: self.page.max(1),
            ..Default::default()
        }
    }
}

/// Client for the Canada government job feed. Scrapes the public search
/// results page and keeps its own short-lived response cache so repeated
/// proxy hits within five minutes do not re-fetch the upstream page.
pub struct JobBankService {
    client: Client,
    base_url: String,
    cache: SearchCache,
}

impl JobBankService {
    pub fn new(base_url: String, cache_ttl: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(
                "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) \
                 Chrome/120.0.0.0 Safari/537.36",
            )
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(Error::Reqwest)?;

        Ok(Self {
            client,
            base_url,
            // Parsed pages are small; 2 MiB comfortably holds a session's
            // worth of distinct queries.
            cache: SearchCache::new(cache_ttl, 2 * 1024 * 1024),
        })
    }

    pub async fn fetch(&self, query: &JobBankQuery) -> Result<SearchPage> {
        let key = query.cache_params().cache_key();
        if let Some(hit) = self.cache.get(&key) {
            debug!(page = query.page, "job bank proxy cache hit");
            return Ok(hit);
        }

        let url = self.build_url(query)?;
        info!(%url, "fetching job bank results page");

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(Error::FeedParse(format!(
                "job bank returned status {}",
                response.status()
            )));
        }
        let html = response.text().await?;
        let page = self.parse_results(&html, query)?;

        self.cache.set(key, page.clone(), None);
        Ok(page)
    }

    fn build_url(&self, query: &JobBankQuery) -> Result<String> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| Error::Config(format!("invalid job bank base URL: {}", e)))?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("sort", "M");
            pairs.append_pair("page", &query.page.max(1).to_string());
            if let Some(keywords) = query.keywords.as_deref().filter(|k| !k.is_empty()) {
                pairs.append_pair("searchstring", keywords);
            }
            if let Some(location) = query.location.as_deref().filter(|l| !l.is_empty()) {
                pairs.append_pair("locationstring", location);
            }
            if let Some(distance) = query.distance {
                pairs.append_pair("distance", &distance.to_string());
            }
            for code in skill_lookup_codes(&query.skills) {
                pairs.append_pair("skillchecklist", code);
            }
        }
        Ok(url.into())
    }

    fn parse_results(&self, html: &str, query: &JobBankQuery) -> Result<SearchPage> {
        let document = Html::parse_document(html);

        let card_selector = selector("article.resultJobItem, article[id^='article-']")?;
        let mut jobs = Vec::new();
        for (index, card) in document.select(&card_selector).enumerate() {
            match self.parse_card(&card, query.page, index) {
                Some(job) => jobs.push(job),
                None => debug!(index, "skipping unparseable job bank card"),
            }
        }

        let total_jobs = self
            .parse_total(&document)
            .unwrap_or(jobs.len() as i64);
        let per_page = jobs.len().max(1) as i64;
        let total_pages = ((total_jobs as f64) / (per_page as f64)).ceil() as i64;

        if jobs.is_empty() {
            warn!(page = query.page, "job bank page yielded no parseable cards");
        }

        Ok(SearchPage {
            jobs,
            total_jobs,
            total_pages: total_pages.max(if total_jobs > 0 { 1 } else { 0 }),
            current_page: query.page.max(1),
            source: "canada-job-bank".to_string(),
        })
    }

    fn parse_card(&self, card: &ElementRef, page: i64, index: usize) -> Option<Job> {
        let title = first_text(card, &["h3.title span.noctitle", "h3.title", "h3"])?;
        let company = first_text(card, &["li.business", ".business"]).unwrap_or_default();
        let location = first_text(card, &["li.location", ".location"]).unwrap_or_default();
        let date = first_text(card, &["li.date", ".date"]);
        let salary = first_text(card, &["li.salary", ".salary"]);
        let summary = first_text(card, &["p.summary", ".summary"]);

        let url = card
            .select(&selector("a").ok()?)
            .find_map(|a| a.value().attr("href"))
            .map(|href| {
                if href.starts_with("http") {
                    href.to_string()
                } else {
                    format!("https://www.jobbank.gc.ca{}", href)
                }
            });

        // Posting id from the detail path when present, else positional.
        let id = url
            .as_deref()
            .and_then(|u| {
                u.split('/')
                    .next_back()
                    .map(|tail| tail.split(';').next().unwrap_or(tail))
                    .filter(|tail| !tail.is_empty())
            })
            .map(|posting| format!("jobbank-{}", posting))
            .unwrap_or_else(|| format!("jobbank-p{}-{}", page.max(1), index));

        let location_lower = location.to_lowercase();
        let remote = location_lower.contains("remote")
            || location_lower.contains("telework")
            || location_lower.contains("virtual");

        let posted_at = date.as_deref().and_then(|raw| {
            chrono::NaiveDate::parse_from_str(raw, "%B %d, %Y")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|dt| dt.and_utc())
        });

        Some(Job {
            id,
            title,
            company,
            location,
            description: summary,
            required_skills: vec![],
            preferred_skills: vec![],
            salary,
            remote,
            job_type: None,
            industry: None,
            source: "canada-job-bank".to_string(),
            url,
            posted_at,
        })
    }

    fn parse_total(&self, document: &Html) -> Option<i64> {
        for raw in ["span.found", ".results-summary .found", "#result-count"] {
            if let Ok(sel) = Selector::parse(raw) {
                if let Some(element) = document.select(&sel).next() {
                    let text: String = element.text().collect();
                    let digits: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
                    if let Ok(total) = digits.parse() {
                        return Some(total);
                    }
                }
            }
        }
        None
    }
}

fn selector(raw: &str) -> Result<Selector> {
    Selector::parse(raw).map_err(|e| Error::FeedParse(format!("bad selector {}: {}", raw, e)))
}

fn first_text(card: &ElementRef, selectors: &[&str]) -> Option<String> {
    for raw in selectors {
        if let Ok(sel) = Selector::parse(raw) {
            if let Some(element) = card.select(&sel).next() {
                let text = clean_text(&element.text().collect::<Vec<_>>().join(" "));
                if !text.is_empty() {
                    return Some(text);
                }
            }
        }
    }
    None
}

fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Precedence adapter: the job bank is only consulted for Canadian searches;
/// for anything else it reports an empty page so the aggregator moves on.
pub struct CanadaJobSource {
    service: Arc<JobBankService>,
}

impl CanadaJobSource {
    pub fn new(service: Arc<JobBankService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl JobSource for CanadaJobSource {
    fn name(&self) -> &'static str {
        "canada-job-bank"
    }

    async fn fetch_page(&self, params: &SearchParams) -> Result<SearchPage> {
        if params.country != Country::Canada {
            return Ok(SearchPage {
                jobs: vec![],
                total_jobs: 0,
                total_pages: 0,
                current_page: params.page(),
                source: self.name().to_string(),
            });
        }

        let query = JobBankQuery {
            keywords: params.keywords.clone(),
            location: params.location.clone(),
            distance: params.radius_km,
            page: params.page(),
            skills: params.skills.clone(),
        };
        self.service.fetch(&query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_PAGE: &str = r#"
        <html><body>
        <span class="found">42</span>
        <article id="article-100001" class="resultJobItem">
          <a href="/jobsearch/jobposting/100001"><h3 class="title"><span class="noctitle">Logistics Coordinator</span></h3></a>
          <ul>
            <li class="business">Maple Freight Ltd</li>
            <li class="location">Toronto (ON)</li>
            <li class="date">August 20, 2026</li>
            <li class="salary">$28.00 hourly</li>
          </ul>
          <p class="summary">Coordinate inbound and outbound shipments.</p>
        </article>
        <article id="article-100002" class="resultJobItem">
          <a href="/jobsearch/jobposting/100002"><h3 class="title"><span class="noctitle">Dispatcher</span></h3></a>
          <ul>
            <li class="business">North Lines</li>
            <li class="location">Remote - Canada</li>
          </ul>
        </article>
        </body></html>
    "#;

    fn service() -> JobBankService {
        JobBankService::new(
            "https://example.test/jobsearch".to_string(),
            Duration::from_secs(300),
        )
        .unwrap()
    }

    #[test]
    fn parses_listing_cards() {
        let svc = service();
        let query = JobBankQuery {
            page: 1,
            ..Default::default()
        };
        let page = svc.parse_results(SAMPLE_PAGE, &query).unwrap();
        assert_eq!(page.jobs.len(), 2);
        assert_eq!(page.total_jobs, 42);
        assert_eq!(page.source, "canada-job-bank");

        let first = &page.jobs[0];
        assert_eq!(first.id, "jobbank-100001");
        assert_eq!(first.title, "Logistics Coordinator");
        assert_eq!(first.company, "Maple Freight Ltd");
        assert!(!first.remote);
        assert_eq!(first.salary.as_deref(), Some("$28.00 hourly"));
        assert!(first.posted_at.is_some());
        assert_eq!(
            first.url.as_deref(),
            Some("https://www.jobbank.gc.ca/jobsearch/jobposting/100001")
        );

        let second = &page.jobs[1];
        assert!(second.remote, "remote derived from location text");
    }

    #[test]
    fn skill_names_map_to_lookup_codes() {
        let codes = skill_lookup_codes(&[
            "Logistics planning".to_string(),
            "underwater basket weaving".to_string(),
        ]);
        assert_eq!(codes, vec!["310105"]);
    }

    #[test]
    fn url_carries_structured_parameters() {
        let svc = service();
        let query = JobBankQuery {
            keywords: Some("supply chain".into()),
            location: Some("Ottawa".into()),
            distance: Some(50),
            page: 2,
            skills: vec!["leadership".into()],
        };
        let url = svc.build_url(&query).unwrap();
        assert!(url.contains("page=2"));
        assert!(url.contains("searchstring=supply+chain"));
        assert!(url.contains("locationstring=Ottawa"));
        assert!(url.contains("distance=50"));
        assert!(url.contains("skillchecklist=310201"));
    }

    #[test]
    fn query_values_are_percent_encoded() {
        let svc = service();
        let query = JobBankQuery {
            keywords: Some("heavy & light duty".into()),
            location: Some("St. John's".into()),
            page: 1,
            ..Default::default()
        };
        let url = svc.build_url(&query).unwrap();
        assert!(url.contains("searchstring=heavy+%26+light+duty"));
        assert!(url.contains("locationstring=St.+John%27s"));
    }
}
