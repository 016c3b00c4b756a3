//! Offline evaluation of a trained classifier
//!
//! ```text
//!   test.csv ──► classifier ──► argmax ──► confusion matrix ──► evaluation_report.json
//!   (normalized)     │                          │
//!                    └── p(true label) ──► loss └──► precision / recall / F1 per letter
//! ```
//!
//! The test subset written by `prepare` is already normalized, so samples go
//! to the classifier as they are. A classifier that records a different
//! normalization id than the prepared one is refused before any sample is
//! scored.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use handsign_core::normalization::short_id;
use handsign_core::{
    persist, ClassificationResult, Classifier, GestureLabel, NormalizationState, PipelineError,
    FEATURE_DIM, NUM_CLASSES,
};
use log::info;
use serde::{Deserialize, Serialize};

use crate::error::{DatasetError, DatasetResult};
use crate::prepare::{NORMALIZATION_FILE, TEST_FILE};
use crate::schema::Dataset;

/// File name of the evaluation report inside the processed directory
pub const EVALUATION_FILE: &str = "evaluation_report.json";

/// Probability floor used when taking the log of the true-class probability
const LOSS_EPSILON: f64 = 1e-7;

/// Precision, recall and F1 of one letter
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    /// Test samples carrying this letter
    pub support: usize,
}

/// Scores of a classifier over one labeled subset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    /// Normalization the classifier was trained against, if it records one
    pub normalization_id: Option<String>,
    pub samples: usize,
    pub correct: usize,
    pub accuracy: f64,
    /// Mean cross-entropy of the true label
    pub loss: f64,
    /// Unweighted mean F1 over letters with support
    pub macro_f1: f64,
    /// Letters that are present in the subset or were predicted at least once
    pub per_class: BTreeMap<GestureLabel, ClassMetrics>,
    /// `confusion[true][predicted]` over the full alphabet
    pub confusion: Vec<Vec<usize>>,
}

impl EvaluationReport {
    /// Count of `truth` samples classified as `predicted`
    pub fn confused(&self, truth: GestureLabel, predicted: GestureLabel) -> usize {
        self.confusion[truth.index()][predicted.index()]
    }

    pub fn save(&self, processed_dir: &Path) -> DatasetResult<()> {
        Ok(persist::write_json_atomic(&processed_dir.join(EVALUATION_FILE), self)?)
    }

    pub fn load(processed_dir: &Path) -> DatasetResult<Self> {
        Ok(persist::read_json(&processed_dir.join(EVALUATION_FILE))?)
    }
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Accuracy {:.4} ({} of {}), loss {:.4}, macro F1 {:.4}",
            self.accuracy, self.correct, self.samples, self.loss, self.macro_f1
        )?;
        writeln!(f, "  label  precision  recall  f1      support")?;
        for (label, m) in &self.per_class {
            writeln!(
                f,
                "  {label}      {:.4}     {:.4}  {:.4}  {}",
                m.precision, m.recall, m.f1, m.support
            )?;
        }
        Ok(())
    }
}

/// Score `classifier` on an already normalized subset
///
/// `normalization_id` is the identity of the state the subset was
/// normalized with; a classifier recording another id is an
/// `ArtifactMismatch`. Any per-sample classifier failure aborts the run.
pub fn evaluate<C: Classifier + ?Sized>(
    classifier: &C,
    subset: &Dataset,
    normalization_id: Option<&str>,
) -> DatasetResult<EvaluationReport> {
    if classifier.input_dim() != FEATURE_DIM {
        return Err(PipelineError::SchemaMismatch {
            expected: FEATURE_DIM,
            actual: classifier.input_dim(),
        }
        .into());
    }
    if classifier.num_classes() != NUM_CLASSES {
        return Err(PipelineError::artifact(
            "classifier",
            format!("{} classes, expected {NUM_CLASSES}", classifier.num_classes()),
        )
        .into());
    }
    if let (Some(recorded), Some(expected)) = (classifier.normalization_id(), normalization_id) {
        if recorded != expected {
            return Err(PipelineError::ArtifactMismatch {
                normalization: expected.to_string(),
                classifier: recorded.to_string(),
            }
            .into());
        }
    }
    if subset.is_empty() {
        return Err(DatasetError::EmptyDataset("nothing to evaluate".to_string()));
    }

    let mut confusion = vec![vec![0usize; NUM_CLASSES]; NUM_CLASSES];
    let mut loss = 0.0f64;
    let outputs = classifier.predict_batch(&subset.features());
    for (sample, output) in subset.samples().iter().zip(outputs) {
        let probabilities = output?;
        let result = ClassificationResult::from_probabilities(&probabilities)?;
        let p_true = f64::from(probabilities[sample.label.index()]).max(LOSS_EPSILON);
        loss -= p_true.ln();
        confusion[sample.label.index()][result.label.index()] += 1;
    }

    let samples = subset.len();
    let correct: usize = (0..NUM_CLASSES).map(|i| confusion[i][i]).sum();
    let per_class = class_metrics(&confusion);
    let supported: Vec<f64> = per_class.values().filter(|m| m.support > 0).map(|m| m.f1).collect();
    let macro_f1 = supported.iter().sum::<f64>() / supported.len().max(1) as f64;

    let report = EvaluationReport {
        normalization_id: classifier.normalization_id().map(str::to_string),
        samples,
        correct,
        accuracy: correct as f64 / samples as f64,
        loss: loss / samples as f64,
        macro_f1,
        per_class,
        confusion,
    };
    info!(
        "Evaluated {} samples: accuracy {:.4}, macro F1 {:.4}",
        report.samples, report.accuracy, report.macro_f1
    );
    Ok(report)
}

/// Score `classifier` on the prepared test subset and write the report
pub fn evaluate_prepared<C: Classifier + ?Sized>(
    classifier: &C,
    processed_dir: &Path,
) -> DatasetResult<EvaluationReport> {
    let normalization = NormalizationState::load(&processed_dir.join(NORMALIZATION_FILE))?;
    let test = Dataset::read_csv(&processed_dir.join(TEST_FILE), None)?;
    info!(
        "Evaluating on {} test samples (normalization {})",
        test.len(),
        short_id(&normalization.id)
    );

    let report = evaluate(classifier, &test, Some(&normalization.id))?;
    report.save(processed_dir)?;
    Ok(report)
}

fn class_metrics(confusion: &[Vec<usize>]) -> BTreeMap<GestureLabel, ClassMetrics> {
    let ratio = |num: usize, den: usize| if den == 0 { 0.0 } else { num as f64 / den as f64 };

    GestureLabel::all()
        .filter_map(|label| {
            let k = label.index();
            let tp = confusion[k][k];
            let support: usize = confusion[k].iter().sum();
            let predicted: usize = confusion.iter().map(|row| row[k]).sum();
            if support == 0 && predicted == 0 {
                return None;
            }
            let precision = ratio(tp, predicted);
            let recall = ratio(tp, support);
            let f1 = if precision + recall > 0.0 {
                2.0 * precision * recall / (precision + recall)
            } else {
                0.0
            };
            Some((
                label,
                ClassMetrics {
                    precision,
                    recall,
                    f1,
                    support,
                },
            ))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::LabeledSample;
    use handsign_core::{FeatureVector, PipelineResult};

    /// Predicts the letter whose index is the first feature, with 0.75
    struct FirstFeatureClassifier {
        normalization_id: Option<String>,
    }

    impl Classifier for FirstFeatureClassifier {
        fn input_dim(&self) -> usize {
            FEATURE_DIM
        }

        fn num_classes(&self) -> usize {
            NUM_CLASSES
        }

        fn normalization_id(&self) -> Option<&str> {
            self.normalization_id.as_deref()
        }

        fn predict(&self, input: &[f32]) -> PipelineResult<Vec<f32>> {
            let mut p = vec![0.01; NUM_CLASSES];
            p[input[0] as usize] = 0.75;
            Ok(p)
        }
    }

    fn label(c: char) -> GestureLabel {
        GestureLabel::from_char(c).unwrap()
    }

    fn sample(first: f32, c: char) -> LabeledSample {
        let mut values = [0.0; FEATURE_DIM];
        values[0] = first;
        LabeledSample::new(FeatureVector::new(values), label(c))
    }

    // Three A right, one B taken for A, one B right
    fn subset() -> Dataset {
        Dataset::new(vec![
            sample(0.0, 'A'),
            sample(0.0, 'A'),
            sample(0.0, 'A'),
            sample(0.0, 'B'),
            sample(1.0, 'B'),
        ])
    }

    fn classifier(id: Option<&str>) -> FirstFeatureClassifier {
        FirstFeatureClassifier {
            normalization_id: id.map(str::to_string),
        }
    }

    #[test]
    fn accuracy_and_per_class_scores() {
        let report = evaluate(&classifier(None), &subset(), None).unwrap();

        assert_eq!(report.samples, 5);
        assert_eq!(report.correct, 4);
        assert!((report.accuracy - 0.8).abs() < 1e-12);

        let a = report.per_class[&label('A')];
        assert!((a.precision - 0.75).abs() < 1e-12);
        assert!((a.recall - 1.0).abs() < 1e-12);
        assert!((a.f1 - 6.0 / 7.0).abs() < 1e-12);
        assert_eq!(a.support, 3);

        let b = report.per_class[&label('B')];
        assert!((b.precision - 1.0).abs() < 1e-12);
        assert!((b.recall - 0.5).abs() < 1e-12);
        assert!((b.f1 - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(report.per_class.len(), 2);
        assert!((report.macro_f1 - (6.0 / 7.0 + 2.0 / 3.0) / 2.0).abs() < 1e-12);
    }

    #[test]
    fn confusion_rows_are_true_labels() {
        let report = evaluate(&classifier(None), &subset(), None).unwrap();
        assert_eq!(report.confused(label('A'), label('A')), 3);
        assert_eq!(report.confused(label('B'), label('A')), 1);
        assert_eq!(report.confused(label('B'), label('B')), 1);
        assert_eq!(report.confused(label('A'), label('B')), 0);
        let total: usize = report.confusion.iter().flatten().sum();
        assert_eq!(total, 5);
    }

    #[test]
    fn loss_is_mean_true_label_cross_entropy() {
        let report = evaluate(&classifier(None), &subset(), None).unwrap();
        let expected = (4.0 * -(0.75f64.ln()) - (0.01f32 as f64).ln()) / 5.0;
        assert!((report.loss - expected).abs() < 1e-6, "{}", report.loss);
    }

    #[test]
    fn predicted_only_letter_is_listed_without_support() {
        let subset = Dataset::new(vec![sample(2.0, 'A')]);
        let report = evaluate(&classifier(None), &subset, None).unwrap();
        let c = report.per_class[&label('C')];
        assert_eq!(c.support, 0);
        assert_eq!(c.precision, 0.0);
        assert_eq!(report.per_class[&label('A')].recall, 0.0);
        assert_eq!(report.macro_f1, 0.0);
    }

    #[test]
    fn foreign_normalization_is_refused() {
        let err = evaluate(&classifier(Some("abc")), &subset(), Some("def")).unwrap_err();
        assert!(matches!(
            err,
            DatasetError::Pipeline(PipelineError::ArtifactMismatch { .. })
        ));

        // Matching or unrecorded ids are accepted
        assert!(evaluate(&classifier(Some("def")), &subset(), Some("def")).is_ok());
        assert_eq!(
            evaluate(&classifier(None), &subset(), Some("def")).unwrap().normalization_id,
            None
        );
    }

    #[test]
    fn empty_subset_is_an_error() {
        let result = evaluate(&classifier(None), &Dataset::default(), None);
        assert!(matches!(result, Err(DatasetError::EmptyDataset(_))));
    }

    #[test]
    fn report_survives_save() {
        let dir = tempfile::tempdir().unwrap();
        let report = evaluate(&classifier(Some("def")), &subset(), None).unwrap();
        report.save(dir.path()).unwrap();
        assert!(dir.path().join(EVALUATION_FILE).exists());

        let loaded = EvaluationReport::load(dir.path()).unwrap();
        assert_eq!(loaded.normalization_id.as_deref(), Some("def"));
        assert_eq!(loaded.confusion, report.confusion);
        assert_eq!(loaded.per_class.len(), 2);
        assert!((loaded.accuracy - report.accuracy).abs() < 1e-12);
    }
}
