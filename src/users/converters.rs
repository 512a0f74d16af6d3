use crate::users::{
    dto::{CreateUserDto, CreateUserRequest, UpdateUserDto, UpdateUserRequest, User, UserDto},
    repo_types::UserRow,
};

impl From<CreateUserRequest> for CreateUserDto {
    fn from(req: CreateUserRequest) -> Self {
        let u = req.user;
        Self {
            firstname: u.firstname,
            lastname: u.lastname,
            email: u.email,
            password: u.password,
        }
    }
}

impl From<UpdateUserRequest> for UpdateUserDto {
    fn from(req: UpdateUserRequest) -> Self {
        Self {
            firstname: req.firstname,
            lastname: req.lastname,
        }
    }
}

impl From<UserRow> for UserDto {
    fn from(r: UserRow) -> Self {
        Self {
            id: r.id,
            firstname: r.firstname,
            lastname: r.lastname,
            email: r.email,
            password_hash: r.password_hash,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

impl From<UserDto> for User {
    fn from(u: UserDto) -> Self {
        Self {
            id: u.id,
            firstname: u.firstname,
            lastname: u.lastname,
            email: u.email,
            password_hash: u.password_hash,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}
