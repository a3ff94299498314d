//! Windows UI Automation backend.
//!
//! Minimal safe wrappers over `IUIAutomation`: top-level windows are matched
//! by name prefix, controls by AutomationId or Name together with their
//! control type. Edits take text through the Value pattern and buttons are
//! pressed through the Invoke pattern.

use windows::{
    core::{BSTR, VARIANT},
    Win32::{
        System::{
            Com::{
                CoCreateInstance, CoInitializeEx, CoUninitialize, CLSCTX_INPROC_SERVER,
                COINIT_APARTMENTTHREADED,
            },
            Diagnostics::Debug::{
                SetErrorMode, SEM_FAILCRITICALERRORS, SEM_NOGPFAULTERRORBOX,
                SEM_NOOPENFILEERRORBOX,
            },
        },
        UI::{
            Accessibility::{
                CUIAutomation, IUIAutomation, IUIAutomationElement, IUIAutomationInvokePattern,
                IUIAutomationValuePattern, TreeScope_Children, TreeScope_Descendants,
                UIA_AutomationIdPropertyId, UIA_ButtonControlTypeId, UIA_ControlTypePropertyId,
                UIA_EditControlTypeId, UIA_InvokePatternId, UIA_NamePropertyId,
                UIA_ValuePatternId,
            },
            Shell::IsUserAnAdmin,
        },
    },
};

use super::PlatformError;
use crate::ui::{Control, ControlRole, Desktop, Locator, UiWindow};

pub fn is_elevated() -> bool {
    // SAFETY: no arguments, only queries the current process token.
    unsafe { IsUserAnAdmin().as_bool() }
}

/// Keeps Windows from raising modal error boxes (missing media, crash
/// reporting) that would block an unattended run.
pub fn suppress_error_dialogs() {
    // SAFETY: only changes the process error mode flags.
    unsafe {
        SetErrorMode(SEM_FAILCRITICALERRORS | SEM_NOGPFAULTERRORBOX | SEM_NOOPENFILEERRORBOX);
    }
}

pub struct UiaDesktop {
    automation: IUIAutomation,
}

impl UiaDesktop {
    pub fn new() -> Result<Self, PlatformError> {
        // SAFETY: COM is initialised on this thread before the automation
        // object is created and uninitialised when the desktop is dropped.
        unsafe {
            CoInitializeEx(None, COINIT_APARTMENTTHREADED)
                .ok()
                .map_err(|e| PlatformError::Automation(e.message().to_string()))?;

            let automation: IUIAutomation =
                CoCreateInstance(&CUIAutomation, None, CLSCTX_INPROC_SERVER).map_err(|e| {
                    CoUninitialize();
                    PlatformError::Automation(e.message().to_string())
                })?;

            Ok(Self { automation })
        }
    }

    fn top_level_window(&self, title_prefix: &str) -> windows::core::Result<Option<UiaWindow>> {
        // SAFETY: all interfaces come from the live automation object.
        unsafe {
            let root = self.automation.GetRootElement()?;
            let condition = self.automation.CreateTrueCondition()?;
            let children = root.FindAll(TreeScope_Children, &condition)?;

            for i in 0..children.Length()? {
                let element = children.GetElement(i)?;
                let name = element.CurrentName()?.to_string();

                if name.starts_with(title_prefix) {
                    tracing::debug!(title = %name, "window matched");
                    return Ok(Some(UiaWindow {
                        automation: self.automation.clone(),
                        element,
                    }));
                }
            }
        }

        Ok(None)
    }
}

impl Drop for UiaDesktop {
    fn drop(&mut self) {
        // SAFETY: balances the CoInitializeEx in `new`.
        unsafe { CoUninitialize() };
    }
}

impl Desktop for UiaDesktop {
    type Window = UiaWindow;

    fn find_window(&self, title_prefix: &str) -> Option<UiaWindow> {
        self.top_level_window(title_prefix).unwrap_or_else(|e| {
            tracing::debug!(error = %e.message(), "window enumeration failed");
            None
        })
    }
}

pub struct UiaWindow {
    automation: IUIAutomation,
    element: IUIAutomationElement,
}

impl UiaWindow {
    fn descendant(&self, locator: &Locator) -> windows::core::Result<IUIAutomationElement> {
        let control_type = match locator.role() {
            ControlRole::Edit => UIA_EditControlTypeId,
            ControlRole::Button => UIA_ButtonControlTypeId,
        };

        let (property, value) = match locator {
            Locator::AutomationId { id, .. } => (UIA_AutomationIdPropertyId, id),
            Locator::Title { title, .. } => (UIA_NamePropertyId, title),
        };

        // SAFETY: the VARIANTs outlive the condition calls that copy them.
        unsafe {
            let by_key = self
                .automation
                .CreatePropertyCondition(property, &VARIANT::from(BSTR::from(value.as_str())))?;
            let by_type = self
                .automation
                .CreatePropertyCondition(UIA_ControlTypePropertyId, &VARIANT::from(control_type.0))?;
            let condition = self.automation.CreateAndCondition(&by_key, &by_type)?;

            self.element.FindFirst(TreeScope_Descendants, &condition)
        }
    }
}

impl UiWindow for UiaWindow {
    type Control = UiaControl;

    fn find(&self, locator: &Locator) -> Option<UiaControl> {
        // FindFirst reports a missing element as a null interface error
        self.descendant(locator)
            .ok()
            .map(|element| UiaControl { element })
    }
}

pub struct UiaControl {
    element: IUIAutomationElement,
}

impl Control for UiaControl {
    fn set_text(&self, text: &str) -> Result<(), String> {
        // SAFETY: the pattern is obtained from and used on a live element.
        unsafe {
            let pattern: IUIAutomationValuePattern = self
                .element
                .GetCurrentPatternAs(UIA_ValuePatternId)
                .map_err(|e| e.message().to_string())?;

            pattern
                .SetValue(&BSTR::from(text))
                .map_err(|e| e.message().to_string())
        }
    }

    fn click(&self) -> Result<(), String> {
        // SAFETY: the pattern is obtained from and used on a live element.
        unsafe {
            let pattern: IUIAutomationInvokePattern = self
                .element
                .GetCurrentPatternAs(UIA_InvokePatternId)
                .map_err(|e| e.message().to_string())?;

            pattern.Invoke().map_err(|e| e.message().to_string())
        }
    }
}
