use super::selector::ProgressCallback;

/// Reports progress through the `log` facade.
pub struct LogProgressCallback;

impl ProgressCallback for LogProgressCallback {
    fn on_generation_start(&mut self, generation: usize) {
        log::info!("Generation {} starting...", generation + 1);
    }

    fn on_generation_complete(&mut self, generation: usize, best_fitness: f64, evaluated: usize) {
        log::info!(
            "Generation {} complete. Best fitness: {:.4}, distinct subsets evaluated: {}",
            generation + 1,
            best_fitness,
            evaluated
        );
    }

    fn on_chromosome_evaluated(&mut self, current: usize, total: usize) {
        if current % 10 == 0 || current == total {
            log::debug!("  Evaluated {}/{} new subsets", current, total);
        }
    }
}

/// Discards every notification.
pub struct SilentProgress;

impl ProgressCallback for SilentProgress {
    fn on_generation_start(&mut self, _generation: usize) {}
    fn on_generation_complete(&mut self, _generation: usize, _best_fitness: f64, _evaluated: usize) {}
    fn on_chromosome_evaluated(&mut self, _current: usize, _total: usize) {}
}

// Forwards progress to another thread, e.g. a front end polling a receiver
pub struct ChannelProgressCallback {
    sender: std::sync::mpsc::Sender<ProgressMessage>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProgressMessage {
    GenerationStart(usize),
    GenerationComplete { generation: usize, best_fitness: f64, evaluated: usize },
    ChromosomeEvaluated { current: usize, total: usize },
}

impl ChannelProgressCallback {
    pub fn new(sender: std::sync::mpsc::Sender<ProgressMessage>) -> Self {
        Self { sender }
    }
}

impl ProgressCallback for ChannelProgressCallback {
    fn on_generation_start(&mut self, generation: usize) {
        let _ = self.sender.send(ProgressMessage::GenerationStart(generation));
    }

    fn on_generation_complete(&mut self, generation: usize, best_fitness: f64, evaluated: usize) {
        let _ = self.sender.send(ProgressMessage::GenerationComplete {
            generation,
            best_fitness,
            evaluated,
        });
    }

    fn on_chromosome_evaluated(&mut self, current: usize, total: usize) {
        let _ = self.sender.send(ProgressMessage::ChromosomeEvaluated { current, total });
    }
}
