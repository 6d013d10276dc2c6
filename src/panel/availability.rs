/*
 *  panel/availability.rs
 *
 *  scout-panel - clawpi-scout indicator panel
 *  (c) 2020-26 Stuart Hunter
 *
 *  Ready / unavailable state for acquired hardware
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use log::{info, warn};

use crate::panel::error::PanelError;

/// Outcome of a component's setup, fixed for its lifetime.
///
/// An `Unavailable` component stays inert; a fresh setup is the only way
/// back to `Ready`.
#[derive(Debug)]
pub enum Availability<T> {
    Ready(T),
    Unavailable,
}

impl<T> Availability<T> {
    /// Record the result of acquiring `component`, logging either way
    pub fn from_setup(component: &'static str, result: Result<T, PanelError>) -> Self {
        match result {
            Ok(handle) => {
                info!("{} initialized", component);
                Availability::Ready(handle)
            }
            Err(e) => {
                warn!("{} not available: {}", component, e);
                Availability::Unavailable
            }
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Availability::Ready(_))
    }

    pub fn as_ref(&self) -> Option<&T> {
        match self {
            Availability::Ready(handle) => Some(handle),
            Availability::Unavailable => None,
        }
    }

    pub fn as_mut(&mut self) -> Option<&mut T> {
        match self {
            Availability::Ready(handle) => Some(handle),
            Availability::Unavailable => None,
        }
    }
}

impl<T> Default for Availability<T> {
    fn default() -> Self {
        Availability::Unavailable
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_setup_is_unavailable() {
        let slot: Availability<u8> =
            Availability::from_setup("widget", Err(PanelError::Gpio("no chip".into())));
        assert!(!slot.is_ready());
        assert!(slot.as_ref().is_none());
    }

    #[test]
    fn test_ready_exposes_handle() {
        let mut slot = Availability::from_setup("widget", Ok(7u8));
        assert!(slot.is_ready());
        if let Some(v) = slot.as_mut() {
            *v += 1;
        }
        assert_eq!(slot.as_ref(), Some(&8));
    }
}
