//! Spectrogram request handler.

use std::sync::Arc;
use std::time::Instant;

use specstream_analysis::{ChangePointData, SpecParams, SpectrogramAnalyzer};
use specstream_protocol::{Outbound, SpectrogramRequest, VectorSeries};
use specstream_storage::{ArrayStore, StoreError};
use tracing::{debug, info, warn};

use super::DISPATCH_TARGET;
use super::errors::DispatchError;
use super::response::Responder;

/// Reads a channel window, analyses it, and streams the results.
pub(crate) struct SpectrogramHandler {
    store: Arc<dyn ArrayStore>,
    analyzer: Arc<dyn SpectrogramAnalyzer>,
}

impl SpectrogramHandler {
    pub(crate) fn new(store: Arc<dyn ArrayStore>, analyzer: Arc<dyn SpectrogramAnalyzer>) -> Self {
        Self { store, analyzer }
    }

    /// Serves one request. The recording is closed afterwards whether or not
    /// the request succeeded.
    pub(crate) fn handle(
        &self,
        request: &SpectrogramRequest,
        responder: &Responder<'_>,
    ) -> Result<(), DispatchError> {
        let id = request.mrn.as_str();
        self.store.open(id)?;
        let outcome = self.stream(request, responder);
        if let Err(error) = self.store.close(id) {
            warn!(target: DISPATCH_TARGET, mrn = id, %error, "failed to close recording");
        }
        outcome
    }

    fn stream(
        &self,
        request: &SpectrogramRequest,
        responder: &Responder<'_>,
    ) -> Result<(), DispatchError> {
        let id = request.mrn.as_str();
        let metadata = self.with_reopen(id, |store| store.metadata(id))?;
        let params = SpecParams::derive(
            id,
            request.channel,
            request.start_time,
            request.end_time,
            &metadata,
        )?;
        let channel = params.channel();
        responder.send(Outbound::new_spectrogram(
            channel,
            params.block_count(),
            params.freq_count(),
            params.sample_rate(),
            params.start_time(),
            params.end_time(),
        ))?;

        let mut samples = vec![0.0_f32; params.window_len()];
        self.with_reopen(id, |store| {
            store.read_channel(id, channel, params.rows(), &mut samples)
        })?;

        let started = Instant::now();
        let matrix = self.analyzer.spectrogram(&params, &samples)?;
        let ChangePointData {
            change_points,
            summed_signal,
        } = self.analyzer.change_points(&matrix);
        info!(
            target: DISPATCH_TARGET,
            mrn = id,
            %channel,
            blocks = matrix.block_count(),
            change_points = change_points.len(),
            elapsed_ms = started.elapsed().as_secs_f64() * 1000.0,
            "spectrogram computed"
        );

        responder.send_with(
            Outbound::update(channel, matrix.block_count(), matrix.freq_count()),
            matrix.into_values(),
        )?;
        responder.send_with(
            Outbound::vector(channel, VectorSeries::ChangePoints),
            change_points,
        )?;
        responder.send_with(
            Outbound::vector(channel, VectorSeries::SummedSignal),
            summed_signal,
        )?;
        Ok(())
    }

    /// Runs `op`, re-opening `id` once if a concurrent request closed it in
    /// between.
    fn with_reopen<T>(
        &self,
        id: &str,
        mut op: impl FnMut(&dyn ArrayStore) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        match op(self.store.as_ref()) {
            Err(StoreError::NotOpen { .. }) => {
                debug!(target: DISPATCH_TARGET, mrn = id, "recording closed concurrently; reopening");
                self.store.open(id)?;
                op(self.store.as_ref())
            }
            other => other,
        }
    }
}
