//! Prompt assembly
//!
//! Builds the single instruction string sent to the completion service:
//! an industry-specialized analyst persona, the dataset schema and
//! aggregates, a sample of rows, prior conversation turns, and the answer
//! format contract.

use serde::{Deserialize, Serialize};

use crate::csv::TableData;
use crate::dataset::Dataset;

/// Number of rows embedded in the prompt as a sample
const PROMPT_SAMPLE_ROWS: usize = 20;

/// One prior conversation turn, relayed verbatim into the prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Turn {
    pub role: String,
    pub content: String,
}

/// An industry specialization block, selected by dataset name.
#[derive(Debug, Clone, Copy)]
pub struct IndustryProfile {
    pub keywords: &'static [&'static str],
    pub specialization: &'static str,
    pub kpis: &'static str,
}

/// Ordered keyword table. The first profile whose keyword matches the
/// lowercased dataset name wins; the order is load-bearing for
/// reproducibility and must not be rearranged.
const INDUSTRY_PROFILES: &[IndustryProfile] = &[
    IndustryProfile {
        keywords: &["ecommerce", "sales"],
        specialization: "E-commerce/Retail Operations with expertise in conversion optimization, customer lifetime value, and multi-channel strategy",
        kpis: "AOV (Average Order Value), CAC (Customer Acquisition Cost), LTV (Lifetime Value), Conversion Rate, Return Rate, Profit Margins by Channel",
    },
    IndustryProfile {
        keywords: &["saas", "metrics"],
        specialization: "SaaS Growth Strategy with expertise in subscription metrics, churn reduction, and product-led growth",
        kpis: "MRR (Monthly Recurring Revenue), ARR (Annual Recurring Revenue), Churn Rate, CAC Payback Period, Net Revenue Retention, Feature Adoption",
    },
    IndustryProfile {
        keywords: &["restaurant", "pnl"],
        specialization: "Restaurant/Food Service Operations with expertise in cost control, labor optimization, and profitability management",
        kpis: "Food Cost %, Labor Cost %, Average Order Value, Table Turnover, Gross Margin, Daily Revenue per Seat",
    },
    IndustryProfile {
        keywords: &["consulting", "project"],
        specialization: "Professional Services/Consulting with expertise in project profitability, client satisfaction, and resource utilization",
        kpis: "Project Margin %, Utilization Rate, Client Satisfaction Score, Repeat Business Rate, Average Project Value, Hourly Billing Rate",
    },
    IndustryProfile {
        keywords: &["retail", "inventory"],
        specialization: "Retail Inventory Management with expertise in demand forecasting, inventory optimization, and supply chain efficiency",
        kpis: "Inventory Turnover, Stockout Rate, Carrying Cost %, Gross Margin by Category, Seasonal Demand Variance, Reorder Efficiency",
    },
];

const DEFAULT_PROFILE: IndustryProfile = IndustryProfile {
    keywords: &[],
    specialization: "Multi-Industry Business Analysis with expertise in operational efficiency and strategic growth",
    kpis: "Revenue Growth Rate, Profit Margins, Operational Efficiency, Market Share, Customer Satisfaction",
};

/// Select the specialization block for a dataset display name.
/// Case-insensitive substring match; first matching keyword set wins.
pub fn industry_profile(dataset_name: &str) -> &'static IndustryProfile {
    let lowered = dataset_name.to_lowercase();
    INDUSTRY_PROFILES
        .iter()
        .find(|profile| profile.keywords.iter().any(|k| lowered.contains(k)))
        .unwrap_or(&DEFAULT_PROFILE)
}

/// Build the full prompt for one question against one dataset.
///
/// Pure function of its inputs; no validation of the requested output
/// format happens here. The JSON shape is a request enforced only at parse
/// time on the response side.
pub fn build_prompt(dataset: &Dataset, question: &str, prior_turns: &[Turn]) -> String {
    let profile = industry_profile(&dataset.name);
    let summary = &dataset.summary;

    let column_lines: Vec<String> = summary
        .columns
        .iter()
        .map(|c| format!("- {}: {}", c.name, c.kind.as_str()))
        .collect();

    let aggregates_json = serde_json::to_string_pretty(&summary.numeric_aggregates)
        .unwrap_or_else(|_| "{}".to_string());

    let mut prompt = format!(
        "You are a seasoned C-suite business consultant specializing in {specialization}.\n\
         \n\
         BUSINESS CONTEXT:\n\
         Dataset: {name}\n\
         Records: {rows}\n\
         Dimensions: {cols} columns\n\
         \n\
         COLUMN KINDS:\n\
         {columns}\n\
         \n\
         NUMERIC AGGREGATES (computed from the full dataset):\n\
         {aggregates}\n\
         \n\
         SAMPLE ROWS:\n\
         {sample}\n\
         \n\
         INDUSTRY-SPECIFIC KPIs TO CONSIDER: {kpis}\n",
        specialization = profile.specialization,
        name = dataset.name,
        rows = summary.total_rows,
        cols = summary.column_count(),
        columns = column_lines.join("\n"),
        aggregates = aggregates_json,
        sample = sample_rows_markdown(&dataset.table, PROMPT_SAMPLE_ROWS),
        kpis = profile.kpis,
    );

    if !prior_turns.is_empty() {
        prompt.push_str("\nPRIOR CONVERSATION:\n");
        for turn in prior_turns {
            prompt.push_str(&format!("{}: {}\n", turn.role, turn.content));
        }
    }

    prompt.push_str(&format!(
        "\nEXECUTIVE INQUIRY: \"{question}\"\n\
         \n\
         Ground every figure in the data above; never answer with placeholder \
         values. Respond with a single JSON object, no surrounding prose, in \
         exactly this shape:\n\
         {{\n\
           \"answer\": \"executive-level answer with specific calculated metrics\",\n\
           \"insights\": [\"key insight with real numbers\"],\n\
           \"recommendations\": [\"actionable step with projected impact\"],\n\
           \"calculations\": {{\"metric_name\": \"calculated value\"}},\n\
           \"visualizations\": [\"suggested chart over the data\"],\n\
           \"confidence\": \"high|medium|low\",\n\
           \"followUpQuestions\": [\"question for deeper analysis\"]\n\
         }}\n"
    ));

    prompt
}

/// Render the first `max_rows` rows as a markdown table for the prompt.
fn sample_rows_markdown(table: &TableData, max_rows: usize) -> String {
    let mut markdown = String::new();

    markdown.push_str("| ");
    markdown.push_str(&table.headers.join(" | "));
    markdown.push_str(" |\n| ");
    let separators: Vec<&str> = table.headers.iter().map(|_| "---").collect();
    markdown.push_str(&separators.join(" | "));
    markdown.push_str(" |\n");

    for row in table.rows.iter().take(max_rows) {
        markdown.push_str("| ");
        let cells: Vec<String> = row.iter().map(|cell| cell.replace('|', "\\|")).collect();
        markdown.push_str(&cells.join(" | "));
        markdown.push_str(" |\n");
    }

    if table.rows.len() > max_rows {
        markdown.push_str(&format!(
            "\n*Showing {} of {} rows*\n",
            max_rows,
            table.rows.len()
        ));
    }

    markdown
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csv::{parse_table, summarize};
    use chrono::Utc;

    fn dataset(name: &str) -> Dataset {
        let table = parse_table("Date,Revenue,Category\n2024-01-01,100.50,A\n2024-01-02,200,B")
            .unwrap();
        let summary = summarize(&table);
        Dataset {
            id: "test".into(),
            name: name.into(),
            description: String::new(),
            table,
            summary,
            uploaded_at: Utc::now(),
        }
    }

    #[test]
    fn test_profile_match_is_case_insensitive() {
        let profile = industry_profile("Q3 SaaS Dashboard");
        assert!(profile.specialization.contains("SaaS"));
    }

    #[test]
    fn test_first_matching_profile_wins() {
        // "sales" (first profile) and "saas" (second) both match; order
        // decides
        let profile = industry_profile("saas sales report");
        assert!(profile.specialization.contains("E-commerce"));
    }

    #[test]
    fn test_unmatched_name_uses_default() {
        let profile = industry_profile("weather observations");
        assert!(profile.specialization.contains("Multi-Industry"));
    }

    #[test]
    fn test_prompt_embeds_data_and_question() {
        let ds = dataset("ecommerce orders");
        let prompt = build_prompt(&ds, "What drives revenue?", &[]);

        assert!(prompt.contains("What drives revenue?"));
        assert!(prompt.contains("Revenue: numeric"));
        assert!(prompt.contains("Date: date"));
        assert!(prompt.contains("| Date | Revenue | Category |"));
        assert!(prompt.contains("followUpQuestions"));
    }

    #[test]
    fn test_prompt_includes_prior_turns() {
        let ds = dataset("metrics");
        let turns = vec![Turn {
            role: "user".into(),
            content: "earlier question".into(),
        }];
        let prompt = build_prompt(&ds, "follow-up?", &turns);
        assert!(prompt.contains("earlier question"));
    }
}
