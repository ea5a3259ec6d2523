use std::collections::HashSet;

use tracing::{info, warn};

use super::factory::SynthConfig;
use super::param::{ParamValue, Parameter};
use super::{SynthAdapter, SynthError, SynthId};

/// Every configured adapter plus the current selection.
///
/// The set is fixed at construction. The selection always names one of the
/// adapters, so `current` cannot fail.
pub struct SynthRegistry {
    adapters: Vec<Box<dyn SynthAdapter>>,
    selected: usize,
}

impl SynthRegistry {
    /// Build one adapter per config, in order, and select `default`.
    pub fn from_configs(configs: &[SynthConfig], default: &SynthId) -> Result<Self, SynthError> {
        Self::new(configs.iter().map(SynthConfig::build).collect(), default)
    }

    pub fn new(adapters: Vec<Box<dyn SynthAdapter>>, default: &SynthId) -> Result<Self, SynthError> {
        if adapters.is_empty() {
            return Err(SynthError::InvalidConfig("no synths configured".to_string()));
        }
        let mut seen = HashSet::new();
        for adapter in &adapters {
            if !seen.insert(adapter.id().clone()) {
                return Err(SynthError::InvalidConfig(format!(
                    "synth id {} configured twice",
                    adapter.id()
                )));
            }
        }
        let selected = adapters
            .iter()
            .position(|a| a.id() == default)
            .ok_or_else(|| SynthError::UnknownSynthId(default.clone()))?;
        Ok(Self { adapters, selected })
    }

    /// Ids in configuration order.
    pub fn ids(&self) -> Vec<&SynthId> {
        self.adapters.iter().map(|a| a.id()).collect()
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    pub fn contains(&self, id: &SynthId) -> bool {
        self.position(id).is_some()
    }

    fn position(&self, id: &SynthId) -> Option<usize> {
        self.adapters.iter().position(|a| a.id() == id)
    }

    /// Change the selection. An unknown id leaves it as it was.
    pub fn select(&mut self, id: &SynthId) -> Result<(), SynthError> {
        match self.position(id) {
            Some(index) => {
                self.selected = index;
                info!(synth = %id, "synth selected");
                Ok(())
            }
            None => {
                warn!(synth = %id, "unknown synth, selection unchanged");
                Err(SynthError::UnknownSynthId(id.clone()))
            }
        }
    }

    pub fn selected_id(&self) -> &SynthId {
        self.adapters[self.selected].id()
    }

    pub fn current(&self) -> &dyn SynthAdapter {
        self.adapters[self.selected].as_ref()
    }

    pub fn current_mut(&mut self) -> &mut dyn SynthAdapter {
        self.adapters[self.selected].as_mut()
    }

    pub fn get(&self, id: &SynthId) -> Result<&dyn SynthAdapter, SynthError> {
        match self.position(id) {
            Some(index) => Ok(self.adapters[index].as_ref()),
            None => Err(SynthError::UnknownSynthId(id.clone())),
        }
    }

    pub fn get_mut(&mut self, id: &SynthId) -> Result<&mut dyn SynthAdapter, SynthError> {
        match self.position(id) {
            Some(index) => Ok(self.adapters[index].as_mut()),
            None => Err(SynthError::UnknownSynthId(id.clone())),
        }
    }

    pub fn parameters(&self, id: &SynthId) -> Result<Vec<Parameter>, SynthError> {
        Ok(self.get(id)?.parameters())
    }

    /// Rejections are logged and returned; the old value stays in effect.
    pub fn set_parameter(&mut self, id: &SynthId, name: &str, value: ParamValue) -> Result<ParamValue, SynthError> {
        let result = self.get_mut(id).and_then(|adapter| adapter.set_parameter(name, value));
        if let Err(err) = &result {
            warn!(synth = %id, parameter = name, %err, "parameter edit rejected");
        }
        result
    }

    pub fn process(&mut self, now: f64) {
        for adapter in &mut self.adapters {
            adapter.process(now);
        }
    }

    pub fn dispose_all(&mut self) {
        for adapter in &mut self.adapters {
            adapter.dispose();
        }
    }
}
