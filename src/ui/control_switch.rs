use anyhow::Result;

use crate::error::LayoutError;
use crate::ui::screen::NodeId;
use crate::ui::shell::Shell;

/// Cycles keyboard focus through a fixed, named set of controls.
///
/// Exactly one control is focused at a time, and it is always the shell's current control
/// after a transition.
#[derive(Clone, Debug)]
pub struct ControlSwitch {
    controls: Vec<(String, NodeId)>,
    current: usize,
}

impl ControlSwitch {
    pub fn new<M: Clone, P>(
        shell: &mut Shell<M, P>,
        controls: Vec<(&str, NodeId)>,
        active: usize,
    ) -> Result<Self> {
        if controls.is_empty() {
            return Err(LayoutError::InvalidConfiguration("no controls to switch between".into()).into());
        }
        if active >= controls.len() {
            return Err(LayoutError::InvalidConfiguration(format!(
                "active control {active} out of range for {} controls",
                controls.len()
            ))
            .into());
        }
        let controls: Vec<(String, NodeId)> = controls
            .into_iter()
            .map(|(name, id)| (name.to_string(), id))
            .collect();
        for (_, id) in &controls {
            shell.screen_mut().unfocus(*id)?;
        }
        let switch = Self {
            controls,
            current: active,
        };
        let id = switch.current_control();
        shell.screen_mut().focus(id)?;
        shell.set_control(id)?;
        Ok(switch)
    }

    pub fn current_control(&self) -> NodeId {
        self.controls[self.current].1
    }

    pub fn current_name(&self) -> &str {
        &self.controls[self.current].0
    }

    pub fn next<M: Clone, P>(&mut self, shell: &mut Shell<M, P>) -> Result<()> {
        let target = (self.current + 1) % self.controls.len();
        self.transition(shell, target)
    }

    pub fn previous<M: Clone, P>(&mut self, shell: &mut Shell<M, P>) -> Result<()> {
        let target = (self.current + self.controls.len() - 1) % self.controls.len();
        self.transition(shell, target)
    }

    pub fn switch_to<M: Clone, P>(&mut self, shell: &mut Shell<M, P>, name: &str) -> Result<()> {
        let target = self
            .controls
            .iter()
            .position(|(n, _)| n == name)
            .ok_or_else(|| LayoutError::UnknownControl(name.to_string()))?;
        self.transition(shell, target)
    }

    fn transition<M: Clone, P>(&mut self, shell: &mut Shell<M, P>, target: usize) -> Result<()> {
        let outgoing = self.current_control();
        shell.screen_mut().unfocus(outgoing)?;
        shell.screen_mut().redraw(outgoing)?;

        self.current = target;
        let incoming = self.current_control();
        shell.screen_mut().focus(incoming)?;
        shell.screen_mut().redraw(incoming)?;
        shell.set_control(incoming)?;
        log::debug!("control switched to {}", self.current_name());
        Ok(())
    }
}
