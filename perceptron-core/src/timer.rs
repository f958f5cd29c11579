//! # Cronômetro de Escopo
//!
//! Mede o tempo de parede de um bloco de código. O relógio dispara na
//! construção e o tempo decorrido é registrado no log quando o guard sai
//! de escopo — **qualquer** caminho de saída, inclusive pânico dentro do
//! bloco, passa pelo `Drop`.
//!
//! O cronômetro é puramente observacional: nenhum peso do modelo depende
//! dele.

use std::time::Instant;

use tracing::info;

/// Guard de cronometragem. Criar com [`Timer::start`] e deixar cair.
///
/// # Exemplo
///
/// ```rust
/// use perceptron_core::Timer;
///
/// {
///     let _t = Timer::start("época");
///     // ... trabalho medido ...
/// } // aqui o tempo decorrido vai para o log
/// ```
#[derive(Debug)]
pub struct Timer {
    label: &'static str,
    tic: Instant,
}

impl Timer {
    /// Inicia a contagem imediatamente.
    pub fn start(label: &'static str) -> Self {
        Self {
            label,
            tic: Instant::now(),
        }
    }

    /// Segundos decorridos desde o início, sem parar o relógio.
    pub fn elapsed_secs(&self) -> f64 {
        self.tic.elapsed().as_secs_f64()
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        info!("{}: {:.2}s decorridos.", self.label, self.elapsed_secs());
    }
}
