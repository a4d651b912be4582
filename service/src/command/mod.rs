//! [`Command`] definition.

pub mod assign_barber_to_shop;
pub mod authorize_user_session;
pub mod cancel_appointment;
pub mod create_appointment;
pub mod create_shop;
pub mod create_treatment;
pub mod create_user;
pub mod create_user_session;
pub mod delete_shop;
pub mod delete_treatment;
pub mod delete_user;
pub mod delete_user_session;
pub mod purge_client_appointments;
pub mod renew_user_session;
pub mod update_appointment;
pub mod update_shop;
pub mod update_treatment;
pub mod update_user_email;
pub mod update_user_name;
pub mod update_user_password;
pub mod update_user_phone;

/// [`Command`] of the [`Service`].
///
/// [`Service`]: crate::Service
pub use common::Handler as Command;

pub use self::{
    assign_barber_to_shop::AssignBarberToShop,
    authorize_user_session::AuthorizeUserSession,
    cancel_appointment::CancelAppointment,
    create_appointment::CreateAppointment, create_shop::CreateShop,
    create_treatment::CreateTreatment, create_user::CreateUser,
    create_user_session::CreateUserSession, delete_shop::DeleteShop,
    delete_treatment::DeleteTreatment, delete_user::DeleteUser,
    delete_user_session::DeleteUserSession,
    purge_client_appointments::PurgeClientAppointments,
    renew_user_session::RenewUserSession,
    update_appointment::UpdateAppointment, update_shop::UpdateShop,
    update_treatment::UpdateTreatment, update_user_email::UpdateUserEmail,
    update_user_name::UpdateUserName,
    update_user_password::UpdateUserPassword,
    update_user_phone::UpdateUserPhone,
};
