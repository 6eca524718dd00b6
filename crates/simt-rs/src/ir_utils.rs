use crate::spec::{
    DType, Function, Instruction, MemRefSpec, Operation, ValueId, ValueType, VectorSpec,
};

/// Builds a vector value type from explicit dimensions.
pub fn vector_type(dtype: DType, shape: &[usize]) -> ValueType {
    ValueType::Vector(VectorSpec::new(dtype, shape.to_vec()))
}

/// Builds a memref value type from explicit dimensions.
pub fn memref_type(dtype: DType, shape: &[usize]) -> ValueType {
    ValueType::MemRef(MemRefSpec::new(dtype, shape.to_vec()))
}

/// Incrementally assembles a function body with fresh value ids.
pub struct FunctionBuilder {
    name: String,
    parameters: Vec<ValueType>,
    parameter_ids: Vec<ValueId>,
    results: Vec<ValueType>,
    result_ids: Vec<ValueId>,
    body: Vec<Instruction>,
    next_value: u32,
}

impl FunctionBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: Vec::new(),
            parameter_ids: Vec::new(),
            results: Vec::new(),
            result_ids: Vec::new(),
            body: Vec::new(),
            next_value: 0,
        }
    }

    fn allocate(&mut self) -> ValueId {
        let id = ValueId(self.next_value);
        self.next_value += 1;
        id
    }

    pub fn param(&mut self, ty: ValueType) -> ValueId {
        let id = self.allocate();
        self.parameters.push(ty);
        self.parameter_ids.push(id);
        id
    }

    pub fn push(&mut self, op: Operation, operands: Vec<ValueId>, output: ValueType) -> ValueId {
        let id = self.allocate();
        self.body.push(Instruction {
            id,
            op,
            operands,
            output,
        });
        id
    }

    /// Marks `value` as a function result; its type must already be known.
    pub fn ret(&mut self, value: ValueId) {
        let ty = self
            .parameter_ids
            .iter()
            .position(|id| *id == value)
            .map(|index| self.parameters[index].clone())
            .or_else(|| {
                self.body
                    .iter()
                    .find(|inst| inst.id == value)
                    .map(|inst| inst.output.clone())
            })
            .expect("returned value must be defined");
        self.results.push(ty);
        self.result_ids.push(value);
    }

    pub fn build(self) -> Function {
        Function {
            name: self.name,
            parameters: self.parameters,
            parameter_ids: self.parameter_ids,
            results: self.results,
            result_ids: self.result_ids,
            body: self.body,
        }
    }
}
