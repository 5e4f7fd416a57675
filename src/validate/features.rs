use super::Context;
use crate::{
    diagnostic::{CheckError, Severity},
    link::features::{self, SupportProblem},
    types::{
        feature_set::{FieldPresence, MessageEncoding},
        field_descriptor_proto::{Label, Type},
        field_options::OptionTargetType,
        FeatureSet, FieldDescriptorProto,
    },
    Error,
};

impl<'a> Context<'a> {
    /// Checks the standard features set directly on an element.
    pub(super) fn check_features(
        &mut self,
        set: Option<&FeatureSet>,
        target: OptionTargetType,
        path: &[i32],
    ) -> Result<(), Error> {
        let set = match set {
            Some(set) => set,
            None => return Ok(()),
        };
        if !self.is_editions() {
            return self.error(CheckError::FeaturesInLegacySyntax, path);
        }

        for (feature, _) in features::set_features(set) {
            let name = format!("features.{}", feature.name);
            match feature.check(self.edition) {
                None => (),
                Some(SupportProblem::NotIntroduced(introduced)) => self.error(
                    CheckError::FeatureNotYetIntroduced {
                        feature: name,
                        introduced: features::edition_name(introduced).to_owned(),
                    },
                    path,
                )?,
                Some(SupportProblem::Removed(removed)) => self.error(
                    CheckError::FeatureRemoved {
                        feature: name,
                        removed: features::edition_name(removed).to_owned(),
                    },
                    path,
                )?,
                Some(SupportProblem::Deprecated(deprecated, warning)) => self.report(
                    Severity::Warning,
                    CheckError::FeatureDeprecated {
                        feature: name,
                        deprecated: features::edition_name(deprecated).to_owned(),
                        warning,
                    },
                    path,
                )?,
            }

            if !feature.targets.contains(&target) {
                self.error(
                    CheckError::InvalidFeatureTarget {
                        reason: feature.invalid_target,
                    },
                    path,
                )?;
            }
        }
        Ok(())
    }

    /// Checks that the features set on a field make sense for its type and label.
    pub(super) fn check_field_features(
        &mut self,
        proto: &FieldDescriptorProto,
        is_extension: bool,
        in_oneof: bool,
        path: &[i32],
    ) -> Result<(), Error> {
        let set = match proto.options.as_ref().and_then(|options| options.features.as_ref()) {
            Some(set) if self.is_editions() => set,
            _ => return Ok(()),
        };

        let is_message = matches!(proto.r#type(), Type::Message | Type::Group);
        let is_repeated = proto.label() == Label::Repeated;

        if set.field_presence.is_some() {
            let reason = if is_repeated {
                Some("repeated fields cannot specify field presence")
            } else if in_oneof {
                Some("oneof fields cannot specify field presence")
            } else if is_extension {
                Some("extensions cannot specify field presence")
            } else if is_message && set.field_presence() == FieldPresence::Implicit {
                Some("message fields cannot specify implicit presence")
            } else {
                None
            };
            if let Some(reason) = reason {
                self.error(CheckError::InvalidFeatureTarget { reason }, path)?;
            }
        }

        if set.message_encoding.is_some() && !is_message {
            self.error(
                CheckError::InvalidFeatureTarget {
                    reason: "only message fields can specify message encoding",
                },
                path,
            )?;
        } else if set.message_encoding() == MessageEncoding::Delimited && is_map_field(self, proto) {
            self.error(
                CheckError::InvalidFeatureTarget {
                    reason: "map fields cannot use delimited encoding",
                },
                path,
            )?;
        }

        if set.repeated_field_encoding.is_some() && !is_repeated {
            self.error(
                CheckError::InvalidFeatureTarget {
                    reason: "only repeated fields can specify repeated field encoding",
                },
                path,
            )?;
        }

        if set.utf8_validation.is_some() && proto.r#type() != Type::String {
            self.error(
                CheckError::InvalidFeatureTarget {
                    reason: "only string fields can specify utf8 validation",
                },
                path,
            )?;
        }

        Ok(())
    }
}

fn is_map_field(ctx: &Context<'_>, proto: &FieldDescriptorProto) -> bool {
    proto.label() == Label::Repeated
        && ctx
            .file
            .get_message_by_name(proto.type_name().trim_start_matches('.'))
            .map_or(false, |message| message.is_map_entry())
}
