//! # Laço de Épocas
//!
//! Orquestração comum a todos os classificadores: valida os parâmetros,
//! embaralha os exemplos com semente fixa, aplica `fit_one` um a um e
//! registra acurácia e tempo de parede por época.
//!
//! O embaralhamento usa um `StdRng` derivado da semente do modelo a cada
//! chamada de `fit` — nunca um gerador global do processo — de modo que
//! dois `fit` idênticos produzem pesos bit a bit iguais, mesmo com vários
//! modelos instanciados ao mesmo tempo.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::info;

use crate::confusion::Accuracy;
use crate::error::{check_fit_params, PerceptronError};
use crate::timer::Timer;

/// Executa `epochs` passadas embaralhadas sobre `data`, delegando cada
/// exemplo ao passo `step` do classificador.
///
/// `step` recebe o exemplo e o coletor de acurácia da época; é ele quem
/// chama `fit_one` e registra o desfecho. O aprendizado é inerentemente
/// sequencial (cada atualização depende do estado deixado pela anterior),
/// então os exemplos são percorridos em ordem estrita dentro da época.
pub(crate) fn run_epochs<T>(
    seed: u64,
    data: &[T],
    epochs: usize,
    alpha: f64,
    mut step: impl FnMut(&T, &mut Accuracy),
) -> Result<(), PerceptronError> {
    check_fit_params(alpha, epochs)?;
    let mut rng = StdRng::seed_from_u64(seed);
    let mut order: Vec<usize> = (0..data.len()).collect();
    info!("iniciando {epochs} época(s) de treino com {} exemplo(s)", data.len());
    for epoch in 1..=epochs {
        order.shuffle(&mut rng);
        let mut accuracy = Accuracy::new();
        {
            let _t = Timer::start("época");
            for &i in &order {
                step(&data[i], &mut accuracy);
            }
        }
        info!("época {epoch:>2}: acurácia {accuracy}");
    }
    Ok(())
}
