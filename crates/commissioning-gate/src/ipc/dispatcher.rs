//! Command dispatcher for the commissioning gate.
//!
//! Demultiplexes invokes and reads onto the gate and marshals the outcome
//! into wire responses. Internal gate failures become
//! `ImStatus::Failure`; nothing here panics.

use tracing::{debug, error};

use crate::domain::{
    AddNocOutcome, CommissioningError, CommissioningGate, GateError, ImStatus, NewFabric,
    OperationalCertStatus, ROOT_ENDPOINT,
};
use crate::ipc::payloads::*;
use crate::ports::{KeyValueStore, TimeSource};

/// Routes commissioner messages to a `CommissioningGate`.
pub struct CommandDispatcher<S, T> {
    gate: CommissioningGate<S, T>,
}

impl<S: KeyValueStore, T: TimeSource> CommandDispatcher<S, T> {
    pub fn new(gate: CommissioningGate<S, T>) -> Self {
        Self { gate }
    }

    pub fn gate(&self) -> &CommissioningGate<S, T> {
        &self.gate
    }

    pub fn gate_mut(&mut self) -> &mut CommissioningGate<S, T> {
        &mut self.gate
    }

    pub fn into_gate(self) -> CommissioningGate<S, T> {
        self.gate
    }

    /// Handle any inbound message.
    pub fn handle(&mut self, request: Request) -> Response {
        match request {
            Request::Invoke(invoke) => Response::Invoke(self.handle_invoke(invoke)),
            Request::Read(read) => Response::Read(self.handle_read(read)),
        }
    }

    /// Handle a command invocation.
    pub fn handle_invoke(&mut self, request: InvokeRequest) -> InvokeResponse {
        let InvokeRequest {
            correlation_id,
            endpoint,
            caller,
            command,
        } = request;

        debug!(
            %correlation_id,
            command = command.name(),
            endpoint,
            "[dispatch] Invoke"
        );

        if endpoint != ROOT_ENDPOINT {
            return InvokeResponse {
                correlation_id,
                response: CommandResponse::Status(ImStatus::UnsupportedEndpoint),
            };
        }

        let response = match command {
            Command::ArmFailSafe {
                expiry_length_seconds,
                breadcrumb,
            } => {
                let error_code = self
                    .gate
                    .arm_fail_safe(&caller, expiry_length_seconds, breadcrumb);
                CommandResponse::ArmFailSafe {
                    error_code,
                    debug_text: debug_text(error_code),
                }
            }
            Command::SetTCAcknowledgements {
                tc_version,
                tc_user_response,
            } => match self.gate.set_tc_acknowledgements(tc_version, tc_user_response) {
                Ok(error_code) => CommandResponse::SetTCAcknowledgements { error_code },
                Err(err) => failure("SetTCAcknowledgements", err),
            },
            Command::CommissioningComplete => match self.gate.commissioning_complete(&caller) {
                Ok(error_code) => CommandResponse::CommissioningComplete {
                    error_code,
                    debug_text: debug_text(error_code),
                },
                Err(err) => failure("CommissioningComplete", err),
            },
            Command::AddNoc {
                fabric_id,
                node_id,
                vendor_id,
                label,
            } => {
                let fabric = NewFabric {
                    fabric_id,
                    node_id,
                    vendor_id,
                    label,
                };
                match self.gate.add_noc(&caller, fabric) {
                    AddNocOutcome::Added { fabric_index } => CommandResponse::Noc {
                        status_code: OperationalCertStatus::Ok,
                        fabric_index: Some(fabric_index),
                    },
                    AddNocOutcome::TableFull => CommandResponse::Noc {
                        status_code: OperationalCertStatus::TableFull,
                        fabric_index: None,
                    },
                    AddNocOutcome::FailsafeRequired => {
                        CommandResponse::Status(ImStatus::FailsafeRequired)
                    }
                    AddNocOutcome::ConstraintError => {
                        CommandResponse::Status(ImStatus::ConstraintError)
                    }
                }
            }
            Command::RemoveFabric { fabric_index } => {
                match self.gate.remove_fabric(fabric_index) {
                    Ok(OperationalCertStatus::Ok) => CommandResponse::Noc {
                        status_code: OperationalCertStatus::Ok,
                        fabric_index: Some(fabric_index),
                    },
                    Ok(status_code) => CommandResponse::Noc {
                        status_code,
                        fabric_index: None,
                    },
                    Err(err) => failure("RemoveFabric", err),
                }
            }
        };

        InvokeResponse {
            correlation_id,
            response,
        }
    }

    /// Handle an attribute read. Reads have no side effects.
    pub fn handle_read(&self, request: ReadRequest) -> ReadResponse {
        let result = if request.endpoint != ROOT_ENDPOINT {
            ReadResult::Status(ImStatus::UnsupportedEndpoint)
        } else {
            ReadResult::Value(self.read_attribute(&request))
        };
        ReadResponse {
            correlation_id: request.correlation_id,
            result,
        }
    }

    fn read_attribute(&self, request: &ReadRequest) -> AttributeValue {
        let tc = self.gate.tc_attributes();
        match request.attribute {
            AttributeId::Breadcrumb => AttributeValue::U64(self.gate.breadcrumb()),
            AttributeId::BasicCommissioningInfo => {
                AttributeValue::BasicCommissioningInfo(self.gate.basic_commissioning_info())
            }
            AttributeId::TCAcceptedVersion => AttributeValue::U16(tc.accepted_version),
            AttributeId::TCMinRequiredVersion => AttributeValue::U16(tc.min_required_version),
            AttributeId::TCAcknowledgements => AttributeValue::U16(tc.acknowledgements),
            AttributeId::TCAcknowledgementsRequired => {
                AttributeValue::Bool(tc.acknowledgements_required)
            }
            AttributeId::Fabrics => AttributeValue::Fabrics(self.gate.fabrics(&request.caller)),
        }
    }
}

fn debug_text(error_code: CommissioningError) -> String {
    if error_code.is_ok() {
        String::new()
    } else {
        error_code.to_string()
    }
}

fn failure(command: &str, err: GateError) -> CommandResponse {
    error!(command, %err, "[dispatch] Command failed internally");
    CommandResponse::Status(ImStatus::Failure)
}
