//! # Snapshot de Modelo
//!
//! A unidade de persistência de um modelo: conjunto de classes,
//! hiperparâmetros (semente, janela de histórico) e a tabela de pesos
//! completa, com os metadados de média necessários para retomar ou
//! reproduzir a finalização.
//!
//! As tabelas internas usam chaves-tupla `(feature, classe)`, que o JSON
//! não representa como chave de objeto; o snapshot achata tudo em uma
//! lista de registros [`WeightRecord`] — enumeração completa e
//! independente de ordem (canonizada por ordenação para comparações
//! estáveis). O formato em disco em si é responsabilidade do chamador;
//! [`ModelSnapshot::to_json`] existe como conveniência.

use serde::{Deserialize, Serialize};

use crate::binary::{BinaryAveragedPerceptron, BinaryPerceptron};
use crate::error::SnapshotError;
use crate::multiclass::{AveragedPerceptron, Perceptron};
use crate::sequence::{SequenceAveragedPerceptron, SequencePerceptron};
use crate::weights::{AveragedEntry, AveragedWeights, SparseWeights};

/// Um peso persistido. Para modelos simples, `total` e `last_step` ficam
/// nos seus valores padrão e são ignorados na carga.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightRecord {
    pub class: String,
    pub feature: String,
    pub weight: f64,
    #[serde(default)]
    pub total: f64,
    #[serde(default)]
    pub last_step: usize,
}

/// Estado global da média preguiçosa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AveragingState {
    pub steps: usize,
    pub finalized: bool,
}

/// Snapshot completo de qualquer modelo da família.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSnapshot {
    /// Classes conhecidas, em ordem fixa de desempate.
    pub classes: Vec<String>,
    /// Semente do embaralhamento (hiperparâmetro de reprodutibilidade).
    pub seed: u64,
    /// Janela de histórico de tags; só presente em modelos sequenciais.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<usize>,
    /// Estado da média; só presente em modelos averaged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub averaging: Option<AveragingState>,
    /// Enumeração completa dos pesos.
    pub weights: Vec<WeightRecord>,
}

impl ModelSnapshot {
    /// Ordena os registros por (classe, feature), tornando snapshots de
    /// modelos idênticos comparáveis por igualdade.
    fn canonicalize(mut self) -> Self {
        self.weights
            .sort_by(|a, b| (&a.class, &a.feature).cmp(&(&b.class, &b.feature)));
        self
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }

    fn require_no_averaging(&self) -> Result<(), SnapshotError> {
        match self.averaging {
            Some(_) => Err(SnapshotError::UnexpectedAveraging),
            None => Ok(()),
        }
    }

    fn require_averaging(&self) -> Result<AveragingState, SnapshotError> {
        self.averaging.ok_or(SnapshotError::MissingAveraging)
    }

    fn sorted_classes(&self) -> Vec<String> {
        let mut classes = self.classes.clone();
        classes.sort();
        classes.dedup();
        classes
    }

    fn check_class(classes: &[String], record: &WeightRecord) -> Result<(), SnapshotError> {
        if classes.binary_search(&record.class).is_err() {
            return Err(SnapshotError::UnknownClass(record.class.clone()));
        }
        Ok(())
    }

    /// Um registro nunca pode estar "no futuro" do relógio global; a
    /// quitação da média calcula `steps - last_step` em `usize`.
    fn check_step(averaging: AveragingState, record: &WeightRecord) -> Result<(), SnapshotError> {
        if record.last_step > averaging.steps {
            return Err(SnapshotError::StepBeyondClock {
                last_step: record.last_step,
                steps: averaging.steps,
            });
        }
        Ok(())
    }
}

/// No caso binário só existe um vetor de pesos, o da classe positiva.
const BINARY_HIT: &str = "true";

impl BinaryPerceptron {
    pub fn to_snapshot(&self) -> ModelSnapshot {
        ModelSnapshot {
            classes: vec!["false".to_string(), BINARY_HIT.to_string()],
            seed: self.seed,
            order: None,
            averaging: None,
            weights: self
                .weights
                .iter()
                .map(|(feature, weight)| WeightRecord {
                    class: BINARY_HIT.to_string(),
                    feature: feature.clone(),
                    weight,
                    total: 0.0,
                    last_step: 0,
                })
                .collect(),
        }
        .canonicalize()
    }

    pub fn from_snapshot(snapshot: &ModelSnapshot) -> Result<Self, SnapshotError> {
        snapshot.require_no_averaging()?;
        let mut weights: SparseWeights<String> = SparseWeights::new();
        for record in &snapshot.weights {
            if record.class != BINARY_HIT {
                return Err(SnapshotError::UnknownClass(record.class.clone()));
            }
            weights.add(record.feature.clone(), record.weight);
        }
        Ok(Self {
            weights,
            seed: snapshot.seed,
        })
    }
}

impl BinaryAveragedPerceptron {
    pub fn to_snapshot(&self) -> ModelSnapshot {
        ModelSnapshot {
            classes: vec!["false".to_string(), BINARY_HIT.to_string()],
            seed: self.seed,
            order: None,
            averaging: Some(AveragingState {
                steps: self.weights.steps(),
                finalized: self.weights.finalized(),
            }),
            weights: self
                .weights
                .iter()
                .map(|(feature, entry)| WeightRecord {
                    class: BINARY_HIT.to_string(),
                    feature: feature.clone(),
                    weight: entry.current,
                    total: entry.total,
                    last_step: entry.last_step,
                })
                .collect(),
        }
        .canonicalize()
    }

    pub fn from_snapshot(snapshot: &ModelSnapshot) -> Result<Self, SnapshotError> {
        let averaging = snapshot.require_averaging()?;
        let mut entries = Vec::with_capacity(snapshot.weights.len());
        for record in &snapshot.weights {
            if record.class != BINARY_HIT {
                return Err(SnapshotError::UnknownClass(record.class.clone()));
            }
            ModelSnapshot::check_step(averaging, record)?;
            entries.push((
                record.feature.clone(),
                AveragedEntry {
                    current: record.weight,
                    total: record.total,
                    last_step: record.last_step,
                },
            ));
        }
        Ok(Self {
            weights: AveragedWeights::from_parts(entries, averaging.steps, averaging.finalized),
            seed: snapshot.seed,
        })
    }
}

impl Perceptron {
    pub fn to_snapshot(&self) -> ModelSnapshot {
        ModelSnapshot {
            classes: self.classes.clone(),
            seed: self.seed,
            order: None,
            averaging: None,
            weights: self
                .weights
                .iter()
                .map(|((feature, class), weight)| WeightRecord {
                    class: class.clone(),
                    feature: feature.clone(),
                    weight,
                    total: 0.0,
                    last_step: 0,
                })
                .collect(),
        }
        .canonicalize()
    }

    pub fn from_snapshot(snapshot: &ModelSnapshot) -> Result<Self, SnapshotError> {
        snapshot.require_no_averaging()?;
        let classes = snapshot.sorted_classes();
        let mut weights: SparseWeights<(String, String)> = SparseWeights::new();
        for record in &snapshot.weights {
            ModelSnapshot::check_class(&classes, record)?;
            weights.add((record.feature.clone(), record.class.clone()), record.weight);
        }
        Ok(Self {
            classes,
            weights,
            seed: snapshot.seed,
        })
    }
}

impl AveragedPerceptron {
    pub fn to_snapshot(&self) -> ModelSnapshot {
        ModelSnapshot {
            classes: self.classes.clone(),
            seed: self.seed,
            order: None,
            averaging: Some(AveragingState {
                steps: self.weights.steps(),
                finalized: self.weights.finalized(),
            }),
            weights: self
                .weights
                .iter()
                .map(|((feature, class), entry)| WeightRecord {
                    class: class.clone(),
                    feature: feature.clone(),
                    weight: entry.current,
                    total: entry.total,
                    last_step: entry.last_step,
                })
                .collect(),
        }
        .canonicalize()
    }

    pub fn from_snapshot(snapshot: &ModelSnapshot) -> Result<Self, SnapshotError> {
        let averaging = snapshot.require_averaging()?;
        let classes = snapshot.sorted_classes();
        let mut entries = Vec::with_capacity(snapshot.weights.len());
        for record in &snapshot.weights {
            ModelSnapshot::check_class(&classes, record)?;
            ModelSnapshot::check_step(averaging, record)?;
            entries.push((
                (record.feature.clone(), record.class.clone()),
                AveragedEntry {
                    current: record.weight,
                    total: record.total,
                    last_step: record.last_step,
                },
            ));
        }
        Ok(Self {
            classes,
            weights: AveragedWeights::from_parts(entries, averaging.steps, averaging.finalized),
            seed: snapshot.seed,
        })
    }
}

impl SequencePerceptron {
    pub fn to_snapshot(&self) -> ModelSnapshot {
        let mut snapshot = self.model.to_snapshot();
        snapshot.order = Some(self.order);
        snapshot
    }

    pub fn from_snapshot(snapshot: &ModelSnapshot) -> Result<Self, SnapshotError> {
        let order = snapshot.order.ok_or(SnapshotError::MissingOrder)?;
        Ok(Self {
            model: Perceptron::from_snapshot(snapshot)?,
            order,
        })
    }
}

impl SequenceAveragedPerceptron {
    pub fn to_snapshot(&self) -> ModelSnapshot {
        let mut snapshot = self.model.to_snapshot();
        snapshot.order = Some(self.order);
        snapshot
    }

    pub fn from_snapshot(snapshot: &ModelSnapshot) -> Result<Self, SnapshotError> {
        let order = snapshot.order.ok_or(SnapshotError::MissingOrder)?;
        Ok(Self {
            model: AveragedPerceptron::from_snapshot(snapshot)?,
            order,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feats(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn trained_multiclass() -> Perceptron {
        let data = vec![
            ("N".to_string(), feats(&["w=casa"])),
            ("V".to_string(), feats(&["w=correu"])),
            ("N".to_string(), feats(&["w=porta"])),
        ];
        let mut model = Perceptron::new(17);
        model.fit(&data, 5, 1.0).unwrap();
        model
    }

    #[test]
    fn test_snapshot_multiclasse_preserva_predicoes() {
        let model = trained_multiclass();
        let restored = Perceptron::from_snapshot(&model.to_snapshot()).unwrap();
        for phi in [feats(&["w=casa"]), feats(&["w=correu"]), feats(&["w=nova"])] {
            assert_eq!(model.predict(&phi), restored.predict(&phi));
        }
        assert_eq!(model.to_snapshot(), restored.to_snapshot());
    }

    #[test]
    fn test_snapshot_roundtrip_json() {
        let model = trained_multiclass();
        let snapshot = model.to_snapshot();
        let json = snapshot.to_json().unwrap();
        assert_eq!(ModelSnapshot::from_json(&json).unwrap(), snapshot);
    }

    #[test]
    fn test_snapshot_averaged_retoma_finalizacao() {
        let data = vec![
            ("A".to_string(), feats(&["f1"])),
            ("B".to_string(), feats(&["f2"])),
        ];
        let mut model = AveragedPerceptron::new(3);
        // treina sem fit() para controlar a finalização manualmente
        for _ in 0..4 {
            for (truth, phi) in &data {
                model.fit_one(truth, phi, 1.0);
            }
        }
        // persiste ANTES de finalizar; a carga deve reproduzir a média
        let mut restored = AveragedPerceptron::from_snapshot(&model.to_snapshot()).unwrap();
        model.finalize();
        restored.finalize();
        for feature in ["f1", "f2"] {
            for class in ["A", "B"] {
                assert_eq!(
                    model.averaged_weight(feature, class),
                    restored.averaged_weight(feature, class)
                );
            }
        }
    }

    #[test]
    fn test_snapshot_binario() {
        let mut model = BinaryPerceptron::new(1);
        model.fit_one(false, &feats(&["b"]), 1.0);
        let restored = BinaryPerceptron::from_snapshot(&model.to_snapshot()).unwrap();
        assert_eq!(restored.weight("b"), -1.0);
        assert_eq!(restored.to_snapshot().classes, vec!["false", "true"]);
    }

    #[test]
    fn test_snapshot_sequencial_carrega_ordem() {
        let model = SequencePerceptron::new(2, 9);
        let snapshot = model.to_snapshot();
        assert_eq!(snapshot.order, Some(2));
        let restored = SequencePerceptron::from_snapshot(&snapshot).unwrap();
        assert_eq!(restored.order(), 2);
    }

    #[test]
    fn test_snapshot_malformado_e_rejeitado() {
        // averaged sem estado de média
        let plain = trained_multiclass().to_snapshot();
        assert_eq!(
            AveragedPerceptron::from_snapshot(&plain).unwrap_err(),
            SnapshotError::MissingAveraging
        );
        // sequencial sem ordem
        assert_eq!(
            SequencePerceptron::from_snapshot(&plain).unwrap_err(),
            SnapshotError::MissingOrder
        );
        // peso órfão, de classe fora do conjunto declarado
        let mut orphan = plain.clone();
        orphan.weights.push(WeightRecord {
            class: "ADV".to_string(),
            feature: "w=ontem".to_string(),
            weight: 1.0,
            total: 0.0,
            last_step: 0,
        });
        assert_eq!(
            Perceptron::from_snapshot(&orphan).unwrap_err(),
            SnapshotError::UnknownClass("ADV".to_string())
        );
    }

    /// Um registro "no futuro" do relógio da média faria `finalize()`
    /// subtrair além de zero em `usize`; a carga deve recusá-lo.
    #[test]
    fn test_snapshot_com_passo_a_frente_do_relogio_e_rejeitado() {
        let future = ModelSnapshot {
            classes: vec!["A".to_string()],
            seed: 0,
            order: None,
            averaging: Some(AveragingState {
                steps: 1,
                finalized: false,
            }),
            weights: vec![WeightRecord {
                class: "A".to_string(),
                feature: "f".to_string(),
                weight: 1.0,
                total: 0.0,
                last_step: 5,
            }],
        };
        assert_eq!(
            AveragedPerceptron::from_snapshot(&future).unwrap_err(),
            SnapshotError::StepBeyondClock {
                last_step: 5,
                steps: 1
            }
        );

        let mut binary = future.clone();
        binary.classes = vec!["false".to_string(), "true".to_string()];
        binary.weights[0].class = "true".to_string();
        assert_eq!(
            BinaryAveragedPerceptron::from_snapshot(&binary).unwrap_err(),
            SnapshotError::StepBeyondClock {
                last_step: 5,
                steps: 1
            }
        );
    }
}
