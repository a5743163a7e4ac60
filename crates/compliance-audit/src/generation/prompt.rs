//! Prompt templates for audits and regulation questions

use crate::ingestion::render::split_data_uri;
use crate::providers::InlineImage;
use crate::types::RegulationSource;

/// Prompt builder over the full corpus
pub struct PromptBuilder;

impl PromptBuilder {
    /// Concatenate every source, each prefixed with its name
    pub fn build_corpus_text(sources: &[RegulationSource]) -> String {
        sources
            .iter()
            .map(|s| format!("[SOURCE: {}]\n{}", s.name, s.content))
            .collect::<Vec<_>>()
            .join("\n---\n")
    }

    /// All page snapshots in corpus order, as inline attachments
    pub fn collect_visual_pages(sources: &[RegulationSource]) -> Vec<InlineImage> {
        sources
            .iter()
            .flat_map(|s| s.visual_pages.iter().flatten())
            .map(|uri| {
                let (mime, payload) = split_data_uri(uri);
                InlineImage::new(mime, payload)
            })
            .collect()
    }

    /// Build the audit prompt
    pub fn build_audit_prompt(scenario: &str, corpus_text: &str) -> String {
        format!(
            r#"You are a high-precision compliance auditor.
Evaluate the [Scenario] against the [Regulation Text] and the attached page images of the regulations.

[Scenario]:
{scenario}

[Regulation Text]:
{corpus_text}

INSTRUCTIONS:
1. Be concise and focus on mapping the scenario to the governing clauses.
2. Always summarize the scenario-to-clause mapping in a Markdown table.
3. Wrap the facts that trigger a violation in <span class="highlight-red">...</span>.
4. Reference clauses as a hierarchical path, e.g. 콘텐츠 > 1. 콘텐츠 계약 > 신규계약.
5. The verdict line must contain exactly one of: 위반, 적합, 판단 불가.

OUTPUT FORMAT:
### ⚖️ 판정 결과: [위반 / 적합 / 판단 불가]
### 📜 관련 근거 조항
> (clause path)
> (quoted clause text)
### 🔍 상세 분석
(analysis including the mapping table)
### 💡 조치 권고 사항
- (recommended actions)
"#,
            scenario = scenario.trim(),
            corpus_text = corpus_text,
        )
    }

    /// Build the question-answering prompt
    pub fn build_question_prompt(question: &str, corpus_text: &str) -> String {
        format!(
            r#"You are a regulation expert. Answer the [Question] strictly from the [Regulation Text] and the attached page images.

[Question]: {question}

[Regulation Text]:
{corpus_text}

INSTRUCTIONS:
- When the source contains a table, recreate it as a Markdown table.
- Be direct and professional.
- Reference clauses as a hierarchical path, e.g. 콘텐츠 > 1. 콘텐츠 계약 > 신규계약.

OUTPUT FORMAT:
### ℹ️ 질문 해설: [summary]
### 📖 상세 근거 및 테이블 해설
(detailed explanation including tables)
"#,
            question = question.trim(),
            corpus_text = corpus_text,
        )
    }
}
