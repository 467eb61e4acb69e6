//! Property-based tests for the verification pipeline using proptest.
//!
//! These tests check the invariants that hold for any input:
//!
//! - Extracted claims are exact, trimmed, ordered slices of the input
//! - Every assembled verdict is internally consistent
//! - Report accuracy is the rounded verified percentage
//! - Merging never touches text it was not asked to correct

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use crate::providers::{PaperRecord, SearchHit, Stance};
    use crate::verify::claims::ClaimExtractor;
    use crate::verify::evidence::{ChannelOutcome, EvidenceBundle};
    use crate::verify::merge::CorrectionMerger;
    use crate::verify::types::{
        accuracy, CitationRef, Claim, ClaimStatus, ClaimType, Report, Verdict, VerdictPolicy,
    };
    use crate::verify::verdict::VerdictAssembler;

    // Text with sentence punctuation, abbreviations, bullets and paragraph breaks
    fn prose() -> impl Strategy<Value = String> {
        prop::collection::vec(
            prop_oneof![
                "[A-Za-z]{1,10}",
                Just(" ".to_string()),
                Just(". ".to_string()),
                Just("? ".to_string()),
                Just("! ".to_string()),
                Just("; ".to_string()),
                Just("\n".to_string()),
                Just("\n\n".to_string()),
                Just("- ".to_string()),
                Just("et al. ".to_string()),
                Just("3.14".to_string()),
                Just("é".to_string()),
            ],
            0..60,
        )
        .prop_map(|parts| parts.concat())
    }

    fn stance() -> impl Strategy<Value = Stance> {
        prop_oneof![
            Just(Stance::Supports),
            Just(Stance::Refutes),
            Just(Stance::Unclear),
        ]
    }

    fn hit() -> impl Strategy<Value = SearchHit> {
        (
            stance(),
            prop::option::of(-50i64..200),
            "[a-z ]{0,20}",
            prop::option::of("[a-z ]{0,20}"),
            prop::option::of(Just("https://example.org/e".to_string())),
        )
            .prop_map(|(stance, confidence, snippet, correction, url)| SearchHit {
                title: None,
                url,
                snippet,
                stance,
                confidence,
                correction,
            })
    }

    fn search_outcome() -> impl Strategy<Value = ChannelOutcome<SearchHit>> {
        prop_oneof![
            Just(ChannelOutcome::Skipped),
            Just(ChannelOutcome::Failed("down".to_string())),
            Just(ChannelOutcome::TimedOut),
            prop::collection::vec(hit(), 0..6).prop_map(ChannelOutcome::Found),
        ]
    }

    fn citation_outcome() -> impl Strategy<Value = ChannelOutcome<PaperRecord>> {
        let record = (2000i32..2025, prop::bool::ANY).prop_map(|(year, same_author)| {
            let author = if same_author { "Ada Smith" } else { "Bo Jones" };
            PaperRecord::new("Some Paper", vec![author.to_string()], Some(year))
        });
        prop_oneof![
            Just(ChannelOutcome::Skipped),
            Just(ChannelOutcome::Failed("down".to_string())),
            Just(ChannelOutcome::TimedOut),
            prop::collection::vec(record, 0..4).prop_map(ChannelOutcome::Found),
        ]
    }

    fn policy() -> impl Strategy<Value = VerdictPolicy> {
        (1u8..=100, 1u8..=100, 0.0f64..1.0).prop_map(|(verified, hallucination, margin)| {
            VerdictPolicy {
                verified_threshold: verified,
                hallucination_threshold: hallucination,
                conflict_margin: margin,
                ..VerdictPolicy::default()
            }
        })
    }

    proptest! {
        /// Every claim is the exact input slice at its span, trimmed, in order.
        #[test]
        fn extracted_claims_are_exact_slices(text in prose()) {
            let claims = ClaimExtractor::new().extract(&text).unwrap();

            let mut last_end = 0;
            for claim in &claims {
                let (start, end) = claim.span.expect("extracted claims carry spans");
                prop_assert!(start >= last_end, "spans overlap or are out of order");
                prop_assert_eq!(&text[start..end], claim.original_text.as_str());
                prop_assert_eq!(claim.original_text.trim(), claim.original_text.as_str());
                prop_assert!(!claim.original_text.is_empty());
                last_end = end;
            }
        }

        /// Whitespace-only input never yields claims.
        #[test]
        fn whitespace_yields_nothing(text in "[ \t\n]{0,40}") {
            prop_assert!(ClaimExtractor::new().extract(&text).unwrap().is_empty());
        }

        /// Verdicts keep correction iff HALLUCINATION, confidence in range,
        /// and SUSPICIOUS below the verdict thresholds.
        #[test]
        fn assembled_verdicts_are_consistent(
            search in search_outcome(),
            citation in citation_outcome(),
            cited_year in prop::option::of(2000i32..2025),
            broken_link in prop::bool::ANY,
            timed_out in prop::bool::ANY,
            policy in policy(),
        ) {
            let mut claim = Claim::new("Smith (2019) measured the glacier.", ClaimType::Fact);
            if cited_year.is_some() {
                claim = claim.with_citation(CitationRef {
                    author: Some("Smith".to_string()),
                    year: cited_year,
                    title: None,
                });
            }
            let mut evidence = EvidenceBundle {
                search,
                citation,
                timed_out,
                ..EvidenceBundle::empty()
            };
            if broken_link {
                evidence.links =
                    vec![crate::providers::LinkStatus::invalid("x", "Invalid URL format")];
            }

            let ceiling = policy.suspicious_ceiling();
            let verdict = VerdictAssembler::new(policy).assemble(&claim, &evidence);

            prop_assert!(verdict.is_consistent(), "inconsistent verdict: {:?}", verdict);
            prop_assert!(verdict.confidence_score <= 100);
            prop_assert_ne!(verdict.status, ClaimStatus::Opinion);
            if verdict.status == ClaimStatus::Suspicious {
                prop_assert!(verdict.confidence_score <= ceiling);
            }
            if let Some(correction) = &verdict.correction {
                prop_assert!(!correction.trim().is_empty());
            }
        }

        /// Accuracy is within half a point of 100 * verified / total.
        #[test]
        fn accuracy_is_rounded_percentage(total in 1usize..500, verified_frac in 0.0f64..=1.0) {
            let verified = ((total as f64) * verified_frac).floor() as usize;
            let exact = 100.0 * verified as f64 / total as f64;
            let got = accuracy(verified, total);

            prop_assert!(got <= 100);
            prop_assert!((got as f64 - exact).abs() <= 0.5 + 1e-9, "{} vs {}", got, exact);
        }

        /// A report without hallucinations leaves text byte-identical.
        #[test]
        fn merge_without_hallucinations_is_identity(
            text in "\\PC{0,80}",
            statuses in prop::collection::vec(0u8..3, 0..5),
        ) {
            let claim = Claim::new(text.clone(), ClaimType::Fact);
            let verdicts = statuses
                .into_iter()
                .map(|s| match s {
                    0 => Verdict::verified(&claim, "ok", None, 90),
                    1 => Verdict::suspicious(&claim, "?", None, 30),
                    _ => Verdict::opinion(&Claim::new(text.clone(), ClaimType::Opinion)),
                })
                .collect();
            let report = Report::from_verdicts(verdicts);

            prop_assert_eq!(CorrectionMerger::merge(&text, &report), text);
        }

        /// Only the flagged sentence changes.
        #[test]
        fn merge_replaces_only_flagged_sentence(
            words in prop::collection::vec("[a-z]{1,8}", 2..6),
            flagged in 0usize..6,
        ) {
            let sentences: Vec<String> = words
                .iter()
                .enumerate()
                .map(|(i, w)| format!("S{} {}.", i, w))
                .collect();
            let text = sentences.join(" ");
            let flagged = flagged % sentences.len();

            let verdicts = sentences
                .iter()
                .enumerate()
                .map(|(i, s)| {
                    let claim = Claim::new(s.clone(), ClaimType::Fact);
                    if i == flagged {
                        Verdict::hallucination(&claim, "wrong", "FIXED.", None, 90)
                    } else {
                        Verdict::verified(&claim, "ok", None, 90)
                    }
                })
                .collect();
            let merged = CorrectionMerger::merge(&text, &Report::from_verdicts(verdicts));

            let mut expected = sentences.clone();
            expected[flagged] = "FIXED.".to_string();
            prop_assert_eq!(merged, expected.join(" "));
        }

        /// Corrections whose text is absent leave the input untouched.
        #[test]
        fn merge_missing_text_is_safe(text in "[a-z .]{0,60}") {
            let claim = Claim::new("ZZZ NOT PRESENT.", ClaimType::Fact);
            let report = Report::from_verdicts(vec![
                Verdict::hallucination(&claim, "wrong", "fixed", None, 90),
            ]);
            prop_assert_eq!(CorrectionMerger::merge(&text, &report), text);
        }
    }
}
