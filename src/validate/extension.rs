use super::{join, kind_name, message::FieldCheck, Context};
use crate::{
    descriptor::{ExtensionDescriptor, Kind, MessageDescriptor},
    diagnostic::CheckError,
    index_to_i32, tag,
    types::{extension_range_options::VerificationState, field_descriptor_proto::Label},
    Error, MAX_MESSAGE_FIELD_NUMBER,
};

impl<'a> Context<'a> {
    pub(super) fn check_extension(&mut self, extension: &ExtensionDescriptor) -> Result<(), Error> {
        let proto = extension.field_descriptor_proto();
        let path = extension.path();
        let kind = extension.kind();

        let mut max_number = MAX_MESSAGE_FIELD_NUMBER;
        if let Some(extendee) = extension.extendee() {
            let is_message_set = extendee
                .descriptor_proto()
                .options
                .as_ref()
                .map_or(false, |options| options.message_set_wire_format());
            if is_message_set {
                max_number = i32::MAX;
                if proto.label() == Label::Repeated || !matches!(kind, Kind::Message(_)) {
                    self.error(
                        CheckError::InvalidMessageSet {
                            reason: "can only be extended by non-repeated message fields",
                        },
                        &join(path, &[tag::field::TYPE]),
                    )?;
                }
            }

            if self.is_proto3() && !is_options_message(extendee.full_name()) {
                self.error(
                    CheckError::Proto3Extension,
                    &join(path, &[tag::field::EXTENDEE]),
                )?;
            }

            self.check_extension_number(extension, &extendee, &kind)?;
        }

        self.check_field_common(FieldCheck {
            proto,
            kind,
            features: extension.features(),
            path,
            is_extension: true,
            in_oneof: false,
            max_number,
        })
    }

    /// Checks the number is in one of the extendee's extension ranges, and matches any
    /// declaration for it.
    fn check_extension_number(
        &mut self,
        extension: &ExtensionDescriptor,
        extendee: &MessageDescriptor,
        kind: &Kind,
    ) -> Result<(), Error> {
        let proto = extension.field_descriptor_proto();
        let number = match proto.number {
            Some(number) => number,
            None => return Ok(()),
        };
        let number_path = join(extension.path(), &[tag::field::NUMBER]);

        let ranges = &extendee.descriptor_proto().extension_range;
        let (range_index, range) = match ranges
            .iter()
            .enumerate()
            .find(|(_, range)| range.start() <= number && number < range.end())
        {
            Some(found) => found,
            None => {
                return self.error(
                    CheckError::ExtensionNumberNotInRange {
                        extendee: extendee.full_name().to_owned(),
                        number,
                    },
                    &number_path,
                )
            }
        };

        let options = match &range.options {
            Some(options) => options,
            None => return Ok(()),
        };
        let verified = !options.declaration.is_empty()
            || (options.verification.is_some()
                && options.verification() == VerificationState::Declaration);

        let (k, declaration) = match options
            .declaration
            .iter()
            .enumerate()
            .find(|(_, declaration)| declaration.number() == number)
        {
            Some(found) => found,
            None if verified => {
                return self.error(
                    CheckError::ExtensionDeclarationMissing {
                        extendee: extendee.full_name().to_owned(),
                        number,
                    },
                    &number_path,
                )
            }
            None => return Ok(()),
        };

        let declared_at = extendee.parent_file().source().describe(&join(
            extendee.path(),
            &[
                tag::message::EXTENSION_RANGE,
                index_to_i32(range_index),
                tag::message::extension_range::OPTIONS,
                tag::extension_range_options::DECLARATION,
                index_to_i32(k),
            ],
        ));

        if declaration.reserved() {
            return self.error(
                CheckError::ExtensionDeclarationReserved {
                    extendee: extendee.full_name().to_owned(),
                    number,
                    declared_at,
                },
                &number_path,
            );
        }

        let mut mismatches = Vec::new();
        let full_name = format!(".{}", extension.full_name());
        if declaration.full_name() != full_name {
            mismatches.push(format!(
                "expected full name \"{}\", found \"{}\"",
                declaration.full_name(),
                full_name
            ));
        }
        let ty = kind_name(kind);
        if declaration.r#type() != ty {
            mismatches.push(format!(
                "expected type \"{}\", found \"{}\"",
                declaration.r#type(),
                ty
            ));
        }
        let is_repeated = proto.label() == Label::Repeated;
        if declaration.repeated() != is_repeated {
            mismatches.push(if declaration.repeated() {
                "expected the extension to be repeated".to_owned()
            } else {
                "expected the extension not to be repeated".to_owned()
            });
        }

        if !mismatches.is_empty() {
            self.error(
                CheckError::ExtensionDeclarationMismatch {
                    name: extension.full_name().to_owned(),
                    declared_at,
                    mismatch: mismatches.join("; "),
                },
                &join(extension.path(), &[tag::field::NAME]),
            )?;
        }

        Ok(())
    }
}

/// Extensions in proto3 files may only extend the descriptor options messages.
fn is_options_message(name: &str) -> bool {
    name.strip_prefix("google.protobuf.")
        .map_or(false, |name| name.ends_with("Options") && !name.contains('.'))
}
