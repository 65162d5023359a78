//! Type table: primitive scalars, pointer indirections and user-defined
//! aggregates with manual member offsets.
//!
//! Every registered name installs a `T`/`T*`/`T**` triple chained through
//! `indirect`; the double pointer's `indirect` folds back to the single
//! pointer, so arbitrarily deep `*` chains resolve without growing the
//! table. Struct layout uses no padding: member offsets are the running
//! sum of member sizes, unions overlay their members at one offset.

mod type_error;

pub use type_error::TypeError;

use crate::errors::Result;
use crate::parser::cursor::Cursor;
use crate::parser::ParseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeId(u32);

impl TypeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone)]
pub struct Member {
    pub name: String,
    pub offset: u64,
    pub size: u64,
    pub ty: TypeId,
    pub is_array: bool,
}

#[derive(Debug)]
pub struct TypeNode {
    pub name: String,
    pub size: u64,
    pub is_signed: bool,
    pub is_pointer: bool,
    pub indirect: TypeId,
    pub base: TypeId,
    pub members: Vec<Member>,
    pub is_struct: bool,
}

#[derive(Debug)]
pub struct TypeTable {
    nodes: Vec<TypeNode>,
    word: u64,
    int_id: TypeId,
    unsigned_id: TypeId,
    char_id: TypeId,
    function_id: TypeId,
}

impl TypeTable {
    pub fn new(word: u64) -> Self {
        let placeholder = TypeId(0);
        let mut table = Self {
            nodes: Vec::new(),
            word,
            int_id: placeholder,
            unsigned_id: placeholder,
            char_id: placeholder,
            function_id: placeholder,
        };
        table.register_primitive("void", word, false);
        table.register_primitive("SCM", word, false);
        table.register_primitive("long", word, true);
        table.unsigned_id = table.register_primitive("unsigned", word, false);
        table.int_id = table.register_primitive("int", word, true);
        table.register_primitive("uint32_t", 4, false);
        table.register_primitive("int32_t", 4, true);
        table.register_primitive("uint16_t", 2, false);
        table.register_primitive("int16_t", 2, true);
        table.register_primitive("uint8_t", 1, false);
        table.register_primitive("int8_t", 1, true);
        table.char_id = table.register_primitive("char", 1, true);
        table.function_id = table.register_primitive("FUNCTION", word, false);
        // the oldest sources predate headers that could declare these
        table.register_primitive("FILE", word, false);
        table.register_primitive("size_t", word, false);
        table.register_primitive("ssize_t", word, true);
        table
    }

    pub fn word_size(&self) -> u64 {
        self.word
    }

    pub fn int(&self) -> TypeId {
        self.int_id
    }

    pub fn unsigned(&self) -> TypeId {
        self.unsigned_id
    }

    pub fn char(&self) -> TypeId {
        self.char_id
    }

    pub fn function(&self) -> TypeId {
        self.function_id
    }

    pub fn get(&self, id: TypeId) -> &TypeNode {
        &self.nodes[id.index()]
    }

    fn push(&mut self, node: TypeNode) -> TypeId {
        let id = TypeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// Install `name`, `name*` and `name**` with the double pointer
    /// folding back onto the single pointer.
    pub fn register_primitive(&mut self, name: &str, size: u64, is_signed: bool) -> TypeId {
        self.register_triple(name, size, is_signed, false)
    }

    fn register_triple(&mut self, name: &str, size: u64, is_signed: bool, is_struct: bool) -> TypeId {
        let value = TypeId(self.nodes.len() as u32);
        let ptr = TypeId(value.0 + 1);
        let pptr = TypeId(value.0 + 2);
        self.push(TypeNode {
            name: name.to_owned(),
            size,
            is_signed,
            is_pointer: false,
            indirect: ptr,
            base: value,
            members: Vec::new(),
            is_struct,
        });
        self.push(TypeNode {
            name: format!("{name}*"),
            size: self.word,
            is_signed: false,
            is_pointer: true,
            indirect: pptr,
            base: value,
            members: Vec::new(),
            is_struct: false,
        });
        self.push(TypeNode {
            name: format!("{name}**"),
            size: self.word,
            is_signed: false,
            is_pointer: true,
            indirect: ptr,
            base: ptr,
            members: Vec::new(),
            is_struct: false,
        });
        value
    }

    /// First-match scan in registration order.
    pub fn lookup(&self, name: &str) -> Option<TypeId> {
        self.nodes
            .iter()
            .position(|n| n.name == name)
            .map(|at| TypeId(at as u32))
    }

    pub fn member(&self, parent: TypeId, name: &str) -> std::result::Result<Member, TypeError> {
        let node = self.get(parent);
        node.members
            .iter()
            .find(|m| m.name == name)
            .cloned()
            .ok_or_else(|| TypeError::UnknownMember {
                parent: node.name.clone(),
                member: name.to_owned(),
            })
    }

    /// Forward references (`struct foo*` inside `struct foo`) create the
    /// triple on first sight with a zero size filled in later.
    pub fn declare_struct(&mut self, name: &str) -> TypeId {
        match self.lookup(name) {
            Some(id) => id,
            None => self.register_triple(name, 0, false, true),
        }
    }

    fn set_layout(&mut self, id: TypeId, size: u64, members: Vec<Member>) {
        self.nodes[id.index()].size = size;
        self.nodes[id.index()].members = members;
    }
}

/// Parse a type name at the cursor: optional `extern`, `struct name` or a
/// primitive, optional `const`, then `*` repetitions. Returns the type and
/// whether `extern` was present.
pub fn type_name(cursor: &mut Cursor, table: &mut TypeTable) -> Result<(TypeId, bool)> {
    let is_extern = cursor.bump_if("extern");
    cursor.bump_if("const");
    let mut ty = if cursor.bump_if("struct") {
        let name = cursor.take()?;
        table.declare_struct(&name)
    } else {
        let name = cursor.take()?;
        table
            .lookup(&name)
            .ok_or_else(|| cursor.fail(ParseError::UnknownType(name)))?
    };
    cursor.bump_if("const");
    while cursor.bump_if("*") {
        ty = table.get(ty).indirect;
    }
    Ok((ty, is_extern))
}

/// Parse `struct name { members };` with the cursor at the name. Handles
/// member arrays and anonymous union overlays.
pub fn create_struct(cursor: &mut Cursor, table: &mut TypeTable) -> Result<()> {
    let name = cursor.take()?;
    let id = table.declare_struct(&name);
    cursor.expect("{")?;
    let mut offset = 0u64;
    let mut members = Vec::new();
    while cursor.peek() != Some("}") {
        if cursor.bump_if("union") {
            cursor.expect("{")?;
            let mut union_size = 0u64;
            while cursor.peek() != Some("}") {
                let member = parse_member(cursor, table, offset)?;
                union_size = union_size.max(member.size);
                members.push(member);
            }
            cursor.expect("}")?;
            cursor.expect(";")?;
            offset += union_size;
        } else {
            let member = parse_member(cursor, table, offset)?;
            offset += member.size;
            members.push(member);
        }
    }
    cursor.expect("}")?;
    cursor.expect(";")?;
    table.set_layout(id, offset, members);
    Ok(())
}

fn parse_member(cursor: &mut Cursor, table: &mut TypeTable, offset: u64) -> Result<Member> {
    let (ty, _) = type_name(cursor, table)?;
    let name = cursor.take()?;
    let elem_size = table.get(ty).size;
    let mut size = elem_size;
    let mut is_array = false;
    if cursor.bump_if("[") {
        let count_text = cursor.take()?;
        let count: u64 = count_text
            .parse()
            .ok()
            .filter(|&n| n > 0)
            .ok_or_else(|| cursor.fail(TypeError::UnsupportedArrayForm(count_text.clone())))?;
        cursor.expect("]")?;
        size = count * elem_size;
        is_array = true;
    }
    cursor.expect(";")?;
    Ok(Member {
        name,
        offset,
        size,
        ty,
        is_array,
    })
}
