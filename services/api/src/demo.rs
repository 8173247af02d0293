use crate::infra::{load_claims, parse_as_of, parse_thesis_type, InMemoryScoreRepository};
use chrono::{DateTime, Utc};
use clap::Args;
use diligence_engine::citations::Claim;
use diligence_engine::config::AppConfig;
use diligence_engine::error::AppError;
use diligence_engine::evidence::{EvidenceImporter, RawEvidence};
use diligence_engine::scoring::{ThesisDefinition, ThesisType};
use diligence_engine::service::{
    CitationReport, DiligenceService, IngestReport, ScoreRecord, ScoreRequest,
};
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct ScoreArgs {
    /// Evidence export (.csv or .json)
    #[arg(long)]
    pub(crate) evidence: PathBuf,
    /// Custom thesis definition as JSON
    #[arg(long, conflicts_with = "thesis_type")]
    pub(crate) thesis: Option<PathBuf>,
    /// Preset thesis (accelerate-organic-growth, buy-and-build, digital-transformation)
    #[arg(long, value_parser = parse_thesis_type)]
    pub(crate) thesis_type: Option<ThesisType>,
    /// Scoring date (YYYY-MM-DD). Defaults to now.
    #[arg(long, value_parser = parse_as_of)]
    pub(crate) as_of: Option<DateTime<Utc>>,
    /// Print the full scoring record as JSON
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct CiteArgs {
    /// Evidence export (.csv or .json)
    #[arg(long)]
    pub(crate) evidence: PathBuf,
    /// Claims as a JSON array of {id, text} or one claim per line
    #[arg(long)]
    pub(crate) claims: PathBuf,
    /// Print the citation report as JSON
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Preset thesis for the demo company
    #[arg(long, value_parser = parse_thesis_type)]
    pub(crate) thesis_type: Option<ThesisType>,
    /// Scoring date (YYYY-MM-DD). Defaults to now.
    #[arg(long, value_parser = parse_as_of)]
    pub(crate) as_of: Option<DateTime<Utc>>,
    /// Skip the citation portion of the demo
    #[arg(long)]
    pub(crate) skip_citations: bool,
}

type LocalService = DiligenceService<InMemoryScoreRepository>;

fn build_service() -> Result<LocalService, AppError> {
    let config = AppConfig::load()?;
    let repository = Arc::new(InMemoryScoreRepository::default());
    Ok(DiligenceService::from_config(repository, &config)?)
}

pub(crate) async fn run_score(args: ScoreArgs) -> Result<(), AppError> {
    let ScoreArgs {
        evidence,
        thesis,
        thesis_type,
        as_of,
        json,
    } = args;

    let records = EvidenceImporter::from_path(&evidence)?;
    let thesis = match thesis {
        Some(path) => {
            let reader = BufReader::new(File::open(path)?);
            let definition: ThesisDefinition = serde_json::from_reader(reader)?;
            Some(definition)
        }
        None => None,
    };

    let service = build_service()?;
    let record = service.score(ScoreRequest {
        thesis,
        thesis_type: thesis_type.or(Some(ThesisType::AccelerateOrganicGrowth)),
        evidence: Some(records),
        as_of,
    })?;

    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
    } else {
        render_score(&record);
    }
    Ok(())
}

pub(crate) async fn run_cite(args: CiteArgs) -> Result<(), AppError> {
    let records = EvidenceImporter::from_path(&args.evidence)?;
    let claims = load_claims(&args.claims)?;

    let service = build_service()?;
    let ingest = service.ingest(&records).await?;
    let report = service.cite(&claims).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        render_ingest(&ingest);
        render_citations(&claims, &report);
    }
    Ok(())
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let thesis_type = args
        .thesis_type
        .unwrap_or(ThesisType::AccelerateOrganicGrowth);

    let service = build_service()?;
    let ingest = service.ingest(&sample_evidence()).await?;
    println!("== Northwind Analytics diligence demo ==");
    render_ingest(&ingest);

    let record = service.score(ScoreRequest {
        thesis: None,
        thesis_type: Some(thesis_type),
        evidence: None,
        as_of: args.as_of,
    })?;
    render_score(&record);

    if !args.skip_citations {
        let claims = sample_claims();
        let report = service.cite(&claims).await?;
        render_citations(&claims, &report);
    }
    Ok(())
}

fn render_ingest(report: &IngestReport) {
    println!(
        "Ingested {} evidence items into {} chunks ({} embedded, {} lexical only)",
        report.accepted, report.chunks, report.embedded, report.unembedded
    );
    for rejected in &report.rejected {
        println!("  skipped: {rejected}");
    }
    for reason in &report.degradations {
        println!("  degraded: {reason}");
    }
}

fn render_score(record: &ScoreRecord) {
    let score = &record.report.score;
    println!();
    println!(
        "Score {} as of {} ({:?} thesis)",
        record.score_id,
        record.as_of.format("%Y-%m-%d"),
        record.thesis.thesis_type
    );
    println!("  {}", score.summary());
    println!(
        "  weighted {:.1} x confidence multiplier {:.3} x (1 - penalty {:.2})",
        score.weighted_score, score.confidence_multiplier, score.penalty
    );
    println!("  Dimensions:");
    for dimension in &score.per_dimension {
        println!(
            "    {:<10} raw {:>5.1}  confidence {:>4.0}%  evidence {}",
            dimension.dimension.label(),
            dimension.raw_score,
            dimension.confidence * 100.0,
            dimension.evidence_count
        );
    }

    let missing = score.missing_critical();
    if !missing.is_empty() {
        let labels: Vec<String> = missing.into_iter().map(|category| category.label()).collect();
        println!("  Missing critical evidence: {}", labels.join(", "));
    }
    for rejected in &record.report.rejected {
        println!("  skipped: {rejected}");
    }
}

fn render_citations(claims: &[Claim], report: &CitationReport) {
    println!();
    println!(
        "Citations: {} supported, {} unsupported{}",
        report.supported,
        report.unsupported,
        if report.degraded { " (degraded)" } else { "" }
    );
    for (claim, result) in claims.iter().zip(&report.claims) {
        println!("  [{}] {}", claim.id, claim.text);
        if result.citations.is_empty() {
            println!("      unsupported ({} candidates considered)", result.candidates_considered);
        }
        for citation in &result.citations {
            println!(
                "      {} {} relevance {:.2} similarity {:.2}: \"{}\"",
                citation.classification.label(),
                citation.chunk_id,
                citation.relevance_score,
                citation.similarity_score,
                citation.excerpt
            );
        }
        for reason in &result.degradations {
            println!("      degraded: {reason}");
        }
    }
}

fn evidence(
    id: &str,
    source_type: &str,
    url: &str,
    category: &str,
    text: &str,
    collected_at: &str,
) -> RawEvidence {
    RawEvidence {
        id: Some(id.to_string()),
        source_type: Some(source_type.to_string()),
        source_url: Some(url.to_string()),
        category: Some(category.to_string()),
        text: Some(text.to_string()),
        collected_at: Some(collected_at.to_string()),
    }
}

pub(crate) fn sample_evidence() -> Vec<RawEvidence> {
    vec![
        evidence(
            "nw-stack",
            "primary",
            "https://northwind.example/engineering",
            "tech_stack",
            "The analytics platform is built in Rust and TypeScript. Every production service is deployed to Kubernetes clusters with automated canary releases.",
            "2025-08-12",
        ),
        evidence(
            "nw-infra",
            "primary",
            "https://northwind.example/trust",
            "infrastructure",
            "Infrastructure runs on AWS across three regions with 99.95% uptime over the last twelve months.",
            "2025-07-30",
        ),
        evidence(
            "nw-security",
            "secondary",
            "https://scanner.example/reports/northwind",
            "security_headers",
            "HSTS, CSP and X-Frame-Options headers are enforced on every public endpoint.",
            "2025-06-02",
        ),
        evidence(
            "nw-pricing",
            "primary",
            "https://northwind.example/pricing",
            "pricing",
            "Enterprise pricing starts at $40,000 per year with usage-based expansion tiers.",
            "2025-09-01",
        ),
        evidence(
            "nw-customers",
            "secondary",
            "https://press.example/northwind-customers",
            "customers",
            "Northwind serves more than 350 mid-market customers, including 40 logistics companies.",
            "2025-05-18",
        ),
        evidence(
            "nw-market",
            "tertiary",
            "https://analyst.example/supply-chain-analytics",
            "market_size",
            "Analysts estimate the supply chain analytics market at $8.4 billion, growing 17% annually.",
            "2025-03-10",
        ),
        evidence(
            "nw-leadership",
            "primary",
            "https://northwind.example/about",
            "leadership",
            "CEO Dana Okafor previously founded and sold a logistics software company.",
            "2025-04-22",
        ),
        evidence(
            "nw-revenue",
            "secondary",
            "https://press.example/northwind-series-b",
            "revenue",
            "Annual recurring revenue reached $18 million, up 62% year over year.",
            "2025-02-14",
        ),
        evidence(
            "nw-forum",
            "forum",
            "https://forum.example/threads/northwind",
            "tech_stack",
            "Anonymous post claiming a GraphQL gateway rewrite is underway.",
            "2025-01-05",
        ),
    ]
}

pub(crate) fn sample_claims() -> Vec<Claim> {
    vec![
        Claim::new("claim-1", "Northwind deploys its production services to Kubernetes"),
        Claim::new("claim-2", "Annual recurring revenue grew 62% to $18 million"),
        Claim::new("claim-3", "The company holds SOC 2 Type II certification"),
    ]
}
